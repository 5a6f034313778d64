//! Directory walk producing the list of files to pack

use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use walkdir::WalkDir;

use crate::filter::{Decision, PathFilter};

/// Walks a directory tree and selects files with a [`PathFilter`]
pub struct Collector {
    root: PathBuf,
    filter: PathFilter,
}

impl Collector {
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    /// Collect the relative paths of all selected files.
    ///
    /// Entries are visited in file name order, so the result is stable
    /// across runs. A top-level `README.md` is moved to the front.
    /// Fails if the walk errors or nothing survives filtering.
    pub fn collect(&self) -> Result<Vec<String>> {
        info!("Scanning {} ...", self.root.display());

        let mut files = Vec::new();
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry
                .with_context(|| format!("Failed to walk directory: {}", self.root.display()))?;
            let rel_path = relative_name(&self.root, entry.path())?;

            if entry.file_type().is_dir() {
                if self.filter.check_dir(&rel_path) == Decision::Prune {
                    debug!("Pruned directory: {}", rel_path);
                    walker.skip_current_dir();
                }
                continue;
            }

            match self.filter.check_file(&rel_path, entry.path()) {
                Decision::Include => files.push(rel_path),
                Decision::Skip(reason) => debug!("Skipped {}: {}", rel_path, reason),
                Decision::Descend | Decision::Prune => {}
            }
        }

        if files.is_empty() {
            return Err(anyhow!("No relevant files found in {}", self.root.display()));
        }

        prioritize_readme(&mut files);
        info!("Found {} files", files.len());
        Ok(files)
    }
}

/// Relative path of `path` below `root`, joined with `/`
pub fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| anyhow!("Failed to get relative path for {}", path.display()))?;

    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// Move the first top-level `readme.md` (any case) to the front, keeping
/// the order of everything else.
pub fn prioritize_readme(files: &mut Vec<String>) {
    let position = files
        .iter()
        .position(|f| !f.contains('/') && f.eq_ignore_ascii_case("readme.md"));

    if let Some(index) = position {
        let readme = files.remove(index);
        files.insert(0, readme);
    }
}
