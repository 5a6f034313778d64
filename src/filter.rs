//! File selection rules
//!
//! [`PathFilter`] decides which entries of a directory walk end up in an
//! archive. Stages run cheapest first:
//!
//! 1. the tool's own output and executable are always skipped
//! 2. directories in [`EXCLUDED_DIRS`] are pruned
//! 3. with filter patterns configured, a file must match one of them
//! 4. a file matching an exclude pattern is skipped
//! 5. built-in name and extension denylists
//! 6. binary signature sniffing (see [`crate::signature`])
//!
//! On restore only stages 3 and 4 apply, see [`PathFilter::check_restore`].

use std::fmt;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use log::warn;

use crate::archive::{PAKTXT_EXTENSION, PROGRAM_NAME};
use crate::signature;

/// Directories that are never descended into
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git", "node_modules", "vendor", "__pycache__", "build", "dist",
    "target", ".idea", ".vscode", ".cache", "tmp",
];

/// OS housekeeping files, compared lowercase
pub const EXCLUDED_NAMES: &[&str] = &[
    ".ds_store", "thumbs.db", "desktop.ini", ".localized", "icon\r",
];

/// Extensions of files that are binary, generated or otherwise unwanted
pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    // executables and libraries
    "exe", "dll", "so", "dylib", "obj", "lib", "a", "class", "pyc",
    // archives
    "zip", "tar", "gz", "rar", "7z", "jar",
    // images
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico",
    // audio and video
    "mp3", "wav", "ogg", "mp4", "avi", "mov", "mkv",
    // documents and databases
    "pdf", "sqlite", "sqlite3", "db",
    // logs, temporary and generic data
    "log", "bin", "lock", "dat", "tmp", "bak", "swp", "swo",
    // IDE artifacts
    "iml", "project", "classpath", "vspscc", "vssscc", "suo", "user", "ncb", "sdf", "ipch",
    // our own output
    "paktxt",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// An ordered list of glob patterns.
///
/// A path matches the list when any pattern matches either its base name
/// or its full relative path.
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    /// Parse the comma-separated form, e.g. `"*.md, temp/*"`.
    ///
    /// Entries are trimmed and empty ones dropped. Invalid globs are
    /// reported and ignored.
    pub fn parse(input: &str) -> Self {
        Self::from_patterns(input.split(','))
    }

    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref().trim();
                if raw.is_empty() {
                    return None;
                }
                match Pattern::new(raw) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        warn!("Invalid glob pattern '{}': {}", raw, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn as_strs(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    /// Whether any pattern matches the base name or the full path
    pub fn matches(&self, path: &str) -> bool {
        let base = base_name(path);
        self.patterns.iter().any(|p| {
            p.matches_with(base, MATCH_OPTIONS) || p.matches_with(path, MATCH_OPTIONS)
        })
    }
}

/// Why an entry was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The tool's own archive or executable
    OwnOutput,
    /// A pruned directory, or a file below one
    ExcludedDir,
    /// Filter patterns are configured and none matched
    NotInFilter,
    /// An exclude pattern matched
    Excluded,
    /// Built-in name or extension denylist
    Denylisted,
    /// Content starts with a known binary signature
    Binary { format: &'static str },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OwnOutput => write!(f, "paktxt output or executable"),
            SkipReason::ExcludedDir => write!(f, "excluded directory"),
            SkipReason::NotInFilter => write!(f, "does not match --filter"),
            SkipReason::Excluded => write!(f, "matches --exclude"),
            SkipReason::Denylisted => write!(f, "excluded name or extension"),
            SkipReason::Binary { format } => write!(f, "binary file ({})", format),
        }
    }
}

/// Outcome of checking one walk entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Collect this file
    Include,
    /// Walk into this directory
    Descend,
    /// Do not walk into this directory
    Prune,
    /// Leave this file out
    Skip(SkipReason),
}

/// The selection pipeline, configured with user patterns
#[derive(Debug, Clone)]
pub struct PathFilter {
    exclude: PatternList,
    filter: PatternList,
    program_name: String,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(PatternList::default(), PatternList::default())
    }
}

impl PathFilter {
    pub fn new(exclude: PatternList, filter: PatternList) -> Self {
        Self {
            exclude,
            filter,
            program_name: PROGRAM_NAME.to_string(),
        }
    }

    /// Override the executable name excluded in stage 1
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    /// Decide about a directory met during the walk
    pub fn check_dir(&self, rel_path: &str) -> Decision {
        if EXCLUDED_DIRS.contains(&base_name(rel_path)) {
            Decision::Prune
        } else {
            Decision::Descend
        }
    }

    /// Decide about a file met during the walk.
    ///
    /// `rel_path` is relative to the walk root with `/` separators and is
    /// what patterns are matched against. `full_path` is used for sniffing.
    pub fn check_file(&self, rel_path: &str, full_path: &Path) -> Decision {
        if let Some(reason) = self.check_name(rel_path) {
            return Decision::Skip(reason);
        }

        match signature::sniff_file(full_path) {
            Ok(Some(sig)) => Decision::Skip(SkipReason::Binary { format: sig.format }),
            Ok(None) => Decision::Include,
            Err(e) => {
                warn!("Error checking binary signature for {}: {}", rel_path, e);
                Decision::Include
            }
        }
    }

    /// Stages 1 to 5, which only look at the path
    pub fn check_name(&self, rel_path: &str) -> Option<SkipReason> {
        if self.is_own_output(rel_path) {
            return Some(SkipReason::OwnOutput);
        }
        if let Some(reason) = self.check_patterns(rel_path) {
            return Some(reason);
        }
        if is_denylisted(rel_path) {
            return Some(SkipReason::Denylisted);
        }
        if in_excluded_dir(rel_path) {
            return Some(SkipReason::ExcludedDir);
        }
        None
    }

    /// Filter whitelist, then exclude blacklist
    pub fn check_patterns(&self, rel_path: &str) -> Option<SkipReason> {
        if !self.filter.is_empty() && !self.filter.matches(rel_path) {
            return Some(SkipReason::NotInFilter);
        }
        if self.exclude.matches(rel_path) {
            return Some(SkipReason::Excluded);
        }
        None
    }

    /// Gate applied to archive entries before they are written back
    pub fn check_restore(&self, name: &str) -> Option<SkipReason> {
        self.check_patterns(name)
    }

    fn is_own_output(&self, rel_path: &str) -> bool {
        if rel_path.to_lowercase().ends_with(PAKTXT_EXTENSION) {
            return true;
        }
        let base = base_name(rel_path);
        base.eq_ignore_ascii_case(&self.program_name)
            || base.eq_ignore_ascii_case(&format!("{}.exe", self.program_name))
    }
}

/// Last `/`-separated component of a relative path
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_denylisted(rel_path: &str) -> bool {
    let name = base_name(rel_path).to_lowercase();
    if EXCLUDED_NAMES.contains(&name.as_str()) {
        return true;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => EXCLUDED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

fn in_excluded_dir(rel_path: &str) -> bool {
    rel_path
        .to_lowercase()
        .split('/')
        .any(|component| EXCLUDED_DIRS.contains(&component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filter(exclude: &str, only: &str) -> PathFilter {
        PathFilter::new(PatternList::parse(exclude), PatternList::parse(only))
    }

    #[test]
    fn test_parse_patterns() {
        let list = PatternList::parse(" *.md, ,temp/* ,,");
        assert_eq!(list.as_strs(), vec!["*.md", "temp/*"]);
        assert!(PatternList::parse("").is_empty());
    }

    #[test]
    fn test_invalid_pattern_dropped() {
        let list = PatternList::parse("[abc,*.rs");
        assert_eq!(list.as_strs(), vec!["*.rs"]);
    }

    #[test]
    fn test_pattern_matches_base_and_full_path() {
        let list = PatternList::parse("*.log,temp/*");
        assert!(list.matches("deep/dir/app.log"));
        assert!(list.matches("temp/a.txt"));
        // `*` does not cross a separator
        assert!(!list.matches("temp/sub/a.txt"));
        assert!(!list.matches("src/main.rs"));
    }

    #[test]
    fn test_filter_then_exclude() {
        let f = filter("main.go", "*.go");
        assert_eq!(f.check_patterns("main.go"), Some(SkipReason::Excluded));
        assert_eq!(f.check_patterns("util.go"), None);
        assert_eq!(f.check_patterns("README.md"), Some(SkipReason::NotInFilter));
    }

    #[test]
    fn test_excluded_dirs_pruned() {
        let f = PathFilter::default();
        assert_eq!(f.check_dir("node_modules"), Decision::Prune);
        assert_eq!(f.check_dir("web/node_modules"), Decision::Prune);
        assert_eq!(f.check_dir("src"), Decision::Descend);
        assert_eq!(f.check_dir("mybuild"), Decision::Descend);
        // the program name only applies to files
        assert_eq!(f.check_dir("cmd/paktxt"), Decision::Descend);
    }

    #[test]
    fn test_own_output() {
        let f = PathFilter::default();
        assert_eq!(f.check_name("out.paktxt"), Some(SkipReason::OwnOutput));
        assert_eq!(f.check_name("dir/OUT.PAKTXT"), Some(SkipReason::OwnOutput));
        assert_eq!(f.check_name("paktxt"), Some(SkipReason::OwnOutput));
        assert_eq!(f.check_name("bin/PakTxt.exe"), Some(SkipReason::OwnOutput));
        assert_eq!(f.check_name("paktxt.go"), None);
    }

    #[test]
    fn test_own_output_wins_over_filter() {
        let f = filter("", "*");
        assert_eq!(f.check_name("x.paktxt"), Some(SkipReason::OwnOutput));
    }

    #[test]
    fn test_custom_program_name() {
        let f = PathFilter::default().with_program_name("bundler");
        assert_eq!(f.check_name("bundler.exe"), Some(SkipReason::OwnOutput));
        assert_eq!(f.check_name("paktxt"), None);
    }

    #[test]
    fn test_denylist() {
        let f = PathFilter::default();
        assert_eq!(f.check_name(".DS_Store"), Some(SkipReason::Denylisted));
        assert_eq!(f.check_name("img/Logo.PNG"), Some(SkipReason::Denylisted));
        assert_eq!(f.check_name("Cargo.lock"), Some(SkipReason::Denylisted));
        assert_eq!(f.check_name("Icon\r"), Some(SkipReason::Denylisted));
        assert_eq!(f.check_name("Makefile"), None);
        assert_eq!(f.check_name("src/lib.rs"), None);
    }

    #[test]
    fn test_component_in_excluded_dir() {
        let f = PathFilter::default();
        assert_eq!(f.check_name("project/Vendor/lib.txt"), Some(SkipReason::ExcludedDir));
        assert_eq!(f.check_name("mybuild/x.txt"), None);
    }

    #[test]
    fn test_exclude_beats_denylist_order() {
        // exclude patterns are consulted before the built-in lists
        let f = filter("*.png", "");
        assert_eq!(f.check_name("a.png"), Some(SkipReason::Excluded));
    }

    #[test]
    fn test_check_file_binary_signature() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tool"), [0x7Fu8, 0x45, 0x4C, 0x46, 0x01]).unwrap();
        std::fs::write(dir.path().join("notes"), "plain\n").unwrap();

        let f = PathFilter::default();
        assert_eq!(
            f.check_file("tool", &dir.path().join("tool")),
            Decision::Skip(SkipReason::Binary { format: "ELF" })
        );
        assert_eq!(f.check_file("notes", &dir.path().join("notes")), Decision::Include);
    }

    #[test]
    fn test_check_file_sniff_error_includes() {
        let dir = TempDir::new().unwrap();
        let f = PathFilter::default();
        assert_eq!(f.check_file("gone.txt", &dir.path().join("gone.txt")), Decision::Include);
    }

    #[test]
    fn test_restore_gate_ignores_denylist() {
        let f = PathFilter::default();
        assert_eq!(f.check_restore("Cargo.lock"), None);
        let f = filter("secret.txt", "");
        assert_eq!(f.check_restore("conf/secret.txt"), Some(SkipReason::Excluded));
    }
}
