//! # paktxt
//!
//! Packs a directory tree of text files into a single `.paktxt` text file and
//! restores it byte-for-byte.
//!
//! ## Archive Format
//!
//! An archive starts with a fixed, human-readable header (see
//! [`archive::PAKTXT_HEADER`]) followed by one block per file:
//!
//! ```text
//! <start delimiter>
//! filename: src/main.rs
//! executable: false
//! trailing_newline: true
//! content:
//! fn main() {}
//! <end delimiter>
//!
//! ```
//!
//! The delimiters ([`archive::START_DELIMITER`], [`archive::END_DELIMITER`])
//! embed a fixed random token. Blocks are located by searching for those
//! exact strings, so file content may contain anything else, including the
//! metadata labels.
//!
//! ## Round-trip Rules
//!
//! - A leading UTF-8 BOM is dropped when packing and not written back
//! - Content is stored verbatim, `\r\n` line endings included
//! - A file without a trailing newline gets one line feed appended so the
//!   end delimiter starts its own line; `trailing_newline: false` tells the
//!   decoder to remove it again
//! - The executable bit is recorded and set again on restore
//!
//! ## File Selection
//!
//! [`Collector`] walks the source tree and asks a [`PathFilter`] about every
//! entry: excluded directories are pruned, user filter and exclude globs are
//! applied, a built-in name and extension denylist follows, and finally the
//! first bytes of each file are checked against known binary signatures
//! ([`signature`]). A top-level `README.md` is moved to the front.
//!
//! ## Example
//!
//! ```no_run
//! use paktxt::{pack, unpack, PackOptions, PatternList, UnpackOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let options = PackOptions::new("my-project").with_exclude(PatternList::parse("*.csv"));
//!     let packed = pack(&options)?;
//!     unpack(&packed, &UnpackOptions::new("restored"))?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod collector;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod restore;
pub mod signature;

pub use archive::{Archive, FileRecord};
pub use collector::Collector;
pub use config::{list, output_path, pack, pack_archive, unpack, PackOptions, UnpackOptions};
pub use decoder::{Decoder, ParseError};
pub use encoder::Encoder;
pub use filter::{Decision, PathFilter, PatternList, SkipReason};
pub use restore::{RestoreSummary, Restorer};
