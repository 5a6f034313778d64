//! Archive data structures

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

// Delimiters are assembled with `concat!` so this source file never contains
// them literally and can be packed into an archive like any other file.

/// Line that opens every file block
pub const START_DELIMITER: &str = concat!("---PAKTXT", "_FILE_START-19f8e7d6-c5b4-a321-b0e9-f8a7d6c5b4a3---");
/// Line that closes every file block
pub const END_DELIMITER: &str = concat!("---PAKTXT", "_FILE_END-19f8e7d6-c5b4-a321-b0e9-f8a7d6c5b4a3---");

// Metadata labels
pub const FILENAME_LABEL: &str = "filename: ";
pub const EXECUTABLE_LABEL: &str = "executable: ";
pub const TRAILING_NEWLINE_LABEL: &str = "trailing_newline: ";
pub const CONTENT_LABEL: &str = "content:";

/// File extension of packed archives
pub const PAKTXT_EXTENSION: &str = ".paktxt";

/// Name of the tool's own executable, excluded while scanning
pub const PROGRAM_NAME: &str = "paktxt";

pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Human-readable preamble written before the first block.
///
/// It is never parsed back. Files whose content starts with it are treated
/// as archives and are not packed again.
pub const PAKTXT_HEADER: &str = "PAKTXT
This document bundles a collection of text files from a directory into a
single .paktxt file produced by the 'paktxt' tool.

Every file is stored in its own block, enclosed by a unique start line and a
unique end line. Inside a block:
  'filename:'          the path of the file, relative to the packed directory
  'executable:'        whether any execute permission bit was set
  'trailing_newline:'  whether the original file ended with a newline
  'content:'           the file bytes follow on the next line, verbatim

Block layout (illustration only, the real delimiters carry a unique token):
---PAKTXT_FILE_START-...---
filename: path/to/file.rs
executable: false
trailing_newline: true
content:
fn main() {}
---PAKTXT_FILE_END-...---

";

/// A single file stored in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative path with `/` separators
    pub name: String,
    /// Whether any execute permission bit was set on disk
    pub is_executable: bool,
    /// Whether the original file ended with a line feed
    pub has_trailing_newline: bool,
    /// Original bytes, without a leading UTF-8 BOM
    pub content: Vec<u8>,
}

impl FileRecord {
    /// Build a record from raw on-disk bytes.
    ///
    /// A leading UTF-8 BOM is dropped. The trailing newline flag is taken
    /// from the original bytes, so `\r\n` endings also count.
    pub fn from_raw(name: impl Into<String>, raw: &[u8], is_executable: bool) -> Self {
        let has_trailing_newline = raw.last() == Some(&b'\n');
        Self {
            name: name.into(),
            is_executable,
            has_trailing_newline,
            content: strip_bom(raw).to_vec(),
        }
    }

    /// Read a file below `root` addressed by its archive name
    pub fn read(root: &Path, name: &str) -> Result<Self> {
        let path = root.join(name);
        let raw = std::fs::read(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let is_executable = match std::fs::metadata(&path) {
            Ok(meta) => is_executable(&meta),
            Err(e) => {
                warn!("Could not stat {}: {}. Assuming non-executable.", path.display(), e);
                false
            }
        };

        Ok(Self::from_raw(name, &raw, is_executable))
    }

    /// Whether the content is itself a packed archive
    pub fn is_paktxt(&self) -> bool {
        self.content.starts_with(PAKTXT_HEADER.as_bytes())
    }
}

/// Remove a leading UTF-8 byte-order mark, if any
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}

/// An ordered collection of file records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub files: Vec<FileRecord>,
}

impl Archive {
    /// Create a new empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the archive
    /// Returns an error if a file with the same name already exists
    pub fn add_file(&mut self, file: FileRecord) -> Result<()> {
        if self.get(&file.name).is_some() {
            anyhow::bail!("Duplicate file: {}", file.name);
        }
        self.files.push(file);
        Ok(())
    }

    /// Add a file, replacing an earlier record with the same name in place.
    /// Returns true if a record was replaced.
    pub fn upsert_file(&mut self, file: FileRecord) -> bool {
        match self.files.iter_mut().find(|f| f.name == file.name) {
            Some(existing) => {
                *existing = file;
                true
            }
            None => {
                self.files.push(file);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Read every listed file below `root`, in order.
    ///
    /// Unreadable files are skipped with a warning, and so is any file that
    /// already holds a packed archive. Neither aborts the batch.
    pub fn from_paths<S: AsRef<str>>(root: &Path, names: &[S]) -> Self {
        let mut archive = Self::new();

        for name in names {
            let name = name.as_ref();
            // Metadata is line based, so a line break in a name cannot be stored
            if name.contains(['\n', '\r']) {
                warn!("Skipping {:?}: file name contains a line break", name);
                continue;
            }

            let record = match FileRecord::read(root, name) {
                Ok(record) => record,
                Err(e) => {
                    warn!("{:#}", e);
                    continue;
                }
            };

            if record.is_paktxt() {
                info!("Skipping {}: it appears to be a paktxt archive", name);
                continue;
            }

            if let Err(e) = archive.add_file(record) {
                warn!("{}", e);
            }
        }

        archive
    }
}
