//! Options for the top-level pack and unpack operations
//!
//! Everything an operation needs is passed in explicitly, so several packs
//! and unpacks can run in one process.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::archive::{Archive, PAKTXT_EXTENSION, PROGRAM_NAME};
use crate::collector::Collector;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::filter::{PathFilter, PatternList};
use crate::restore::{RestoreSummary, Restorer};

/// Options for [`pack`]
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Directory to scan
    pub root: PathBuf,
    /// Files matching any of these are skipped
    pub exclude: PatternList,
    /// When non-empty, only files matching one of these are packed
    pub filter: PatternList,
    /// Executable name that is never packed
    pub program_name: String,
}

impl PackOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: PatternList::default(),
            filter: PatternList::default(),
            program_name: PROGRAM_NAME.to_string(),
        }
    }

    pub fn with_exclude(mut self, exclude: PatternList) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_filter(mut self, filter: PatternList) -> Self {
        self.filter = filter;
        self
    }

    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(self.exclude.clone(), self.filter.clone())
            .with_program_name(self.program_name.clone())
    }
}

/// Options for [`unpack`]
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Directory files are restored into
    pub dest: PathBuf,
    pub exclude: PatternList,
    pub filter: PatternList,
    /// Reject unknown metadata lines
    pub strict: bool,
}

impl UnpackOptions {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            exclude: PatternList::default(),
            filter: PatternList::default(),
            strict: false,
        }
    }

    pub fn with_exclude(mut self, exclude: PatternList) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_filter(mut self, filter: PatternList) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Scan and read a directory tree into an archive
pub fn pack_archive(options: &PackOptions) -> Result<Archive> {
    let files = Collector::new(&options.root, options.path_filter()).collect()?;
    let archive = Archive::from_paths(&options.root, &files);
    if archive.is_empty() {
        anyhow::bail!("None of the {} selected files could be packed", files.len());
    }
    Ok(archive)
}

/// Scan, read and encode a directory tree
pub fn pack(options: &PackOptions) -> Result<Vec<u8>> {
    Ok(Encoder::new().encode(&pack_archive(options)?))
}

/// Decode archive bytes and restore the files
pub fn unpack(input: &[u8], options: &UnpackOptions) -> Result<RestoreSummary> {
    let archive = decode(input, options.strict)?;
    let filter = PathFilter::new(options.exclude.clone(), options.filter.clone());
    let summary = Restorer::new(&options.dest, filter).restore(&archive)?;
    info!("Restored {} of {} files", summary.restored.len(), archive.len());
    Ok(summary)
}

/// Decode archive bytes without touching the filesystem
pub fn list(input: &[u8]) -> Result<Archive> {
    decode(input, false)
}

fn decode(input: &[u8], strict: bool) -> Result<Archive> {
    if input.iter().all(u8::is_ascii_whitespace) {
        anyhow::bail!("Input content is empty or contains no parsable paktxt data");
    }
    let archive = Decoder::new()
        .with_strict(strict)
        .decode(input)
        .context("Failed to parse paktxt content")?;
    Ok(archive)
}

/// Give an output path the `.paktxt` extension when it has none.
/// A different extension is kept, with a warning.
pub fn output_path(path: &Path) -> PathBuf {
    match path.extension() {
        None => {
            let mut name = path.as_os_str().to_owned();
            name.push(PAKTXT_EXTENSION);
            PathBuf::from(name)
        }
        Some(ext) => {
            if !PAKTXT_EXTENSION.trim_start_matches('.').eq_ignore_ascii_case(&ext.to_string_lossy()) {
                warn!(
                    "Output file '{}' does not have a '{}' extension. Using as is.",
                    path.display(),
                    PAKTXT_EXTENSION
                );
            }
            path.to_path_buf()
        }
    }
}
