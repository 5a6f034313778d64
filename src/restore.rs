//! Writing decoded files back to disk

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::archive::{Archive, FileRecord};
use crate::filter::{PathFilter, SkipReason};

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// What a restore run did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Files written, in archive order
    pub restored: Vec<String>,
    /// Files left out by patterns
    pub skipped: Vec<(String, SkipReason)>,
    /// Files whose execute bit could not be set
    pub permission_warnings: Vec<String>,
    /// Names rejected because they would land outside the destination
    pub unsafe_names: Vec<String>,
}

/// Restores archive records below a destination directory
pub struct Restorer {
    dest: PathBuf,
    filter: PathFilter,
}

impl Restorer {
    pub fn new(dest: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            dest: dest.into(),
            filter,
        }
    }

    /// Write every record that passes the filter and exclude patterns.
    ///
    /// Pattern skips and permission problems are reported and do not stop
    /// the run. Any failure to create a directory or write a file aborts
    /// the remaining restore.
    pub fn restore(&self, archive: &Archive) -> Result<RestoreSummary> {
        let mut summary = RestoreSummary::default();

        for file in &archive.files {
            if let Some(reason) = self.filter.check_restore(&file.name) {
                info!("Skipping restoration of {}: {}", file.name, reason);
                summary.skipped.push((file.name.clone(), reason));
                continue;
            }

            let Some(target) = self.target_path(&file.name) else {
                warn!("Refusing to restore {}: path leaves the destination directory", file.name);
                summary.unsafe_names.push(file.name.clone());
                continue;
            };

            self.write_file(&target, file)?;
            info!("Restored: {}", file.name);

            if file.is_executable {
                if let Err(e) = set_executable(&target) {
                    warn!("Failed to set executable permission for '{}': {}", file.name, e);
                    summary.permission_warnings.push(file.name.clone());
                }
            }
            summary.restored.push(file.name.clone());
        }

        Ok(summary)
    }

    /// Destination path for an archive name, or None if the name is
    /// absolute or climbs out with `..`
    fn target_path(&self, name: &str) -> Option<PathBuf> {
        let mut target = self.dest.clone();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => target.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        (target != self.dest).then_some(target)
    }

    fn write_file(&self, target: &Path, file: &FileRecord) -> Result<()> {
        if let Some(parent) = target.parent() {
            create_dirs(parent).with_context(|| {
                format!("Failed to create directory '{}' for file '{}'", parent.display(), file.name)
            })?;
        }

        let mut out = open_for_write(target)
            .with_context(|| format!("Failed to write file '{}'", target.display()))?;
        out.write_all(&file.content)
            .with_context(|| format!("Failed to write file '{}'", target.display()))?;
        Ok(())
    }
}

#[cfg(unix)]
fn create_dirs(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(DIR_MODE).create(path)
}

#[cfg(not(unix))]
fn create_dirs(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
