//! Binary file detection by magic number
//!
//! Only a short prefix of each file is inspected. The known formats live in
//! a table of [`Signature`] entries, so supporting another format means
//! adding a row rather than another branch.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Maximum number of bytes read from a file for detection
pub const SNIFF_LEN: usize = 256;

/// Files shorter than this are never classified as binary
pub const MIN_SNIFF_LEN: usize = 4;

/// How a signature is recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Fixed bytes at a fixed offset
    Magic { offset: usize, bytes: &'static [u8] },
    /// DOS `MZ` stub whose little-endian pointer at 0x3C leads to `PE\0\0`
    PeHeader,
}

/// A known binary format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub format: &'static str,
    pub check: Check,
}

const fn magic(format: &'static str, bytes: &'static [u8]) -> Signature {
    Signature { format, check: Check::Magic { offset: 0, bytes } }
}

const PE_POINTER_OFFSET: usize = 0x3C;
const PE_MAGIC: &[u8] = b"PE\0\0";

/// Every format recognised as binary
pub const SIGNATURES: &[Signature] = &[
    magic("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    magic("Mach-O", &[0xFE, 0xED, 0xFA, 0xCE]),
    magic("Mach-O", &[0xCE, 0xFA, 0xED, 0xFE]),
    magic("Mach-O", &[0xFE, 0xED, 0xFA, 0xCF]),
    magic("Mach-O", &[0xCF, 0xFA, 0xED, 0xFE]),
    Signature { format: "PE", check: Check::PeHeader },
    magic("ZIP", &[0x50, 0x4B, 0x03, 0x04]),
    magic("ZIP", &[0x50, 0x4B, 0x05, 0x06]),
    magic("ZIP", &[0x50, 0x4B, 0x07, 0x08]),
    magic("gzip", &[0x1F, 0x8B]),
    magic("7z", &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]),
    magic("SQLite", b"SQLite format 3\0"),
    magic("PNG", &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
    magic("JPEG", &[0xFF, 0xD8, 0xFF, 0xE0]),
    magic("JPEG", &[0xFF, 0xD8, 0xFF, 0xE1]),
    magic("GIF", b"GIF87a"),
    magic("GIF", b"GIF89a"),
    magic("BMP", b"BM"),
    magic("PDF", b"%PDF"),
];

impl Signature {
    /// Check this signature against a file prefix
    pub fn matches(&self, prefix: &[u8]) -> bool {
        match self.check {
            Check::Magic { offset, bytes } => prefix
                .get(offset..offset + bytes.len())
                .map_or(false, |window| window == bytes),
            Check::PeHeader => is_pe(prefix),
        }
    }
}

fn is_pe(prefix: &[u8]) -> bool {
    if !prefix.starts_with(b"MZ") {
        return false;
    }
    let Some(pointer) = prefix.get(PE_POINTER_OFFSET..PE_POINTER_OFFSET + 4) else {
        return false;
    };
    let header = u32::from_le_bytes([pointer[0], pointer[1], pointer[2], pointer[3]]) as usize;
    // The PE header only counts when it lies inside the sniffed prefix
    header
        .checked_add(PE_MAGIC.len())
        .and_then(|end| prefix.get(header..end))
        .map_or(false, |window| window == PE_MAGIC)
}

/// Identify the binary format of a file prefix, if any
pub fn detect(prefix: &[u8]) -> Option<&'static Signature> {
    if prefix.len() < MIN_SNIFF_LEN {
        return None;
    }
    let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];
    SIGNATURES.iter().find(|sig| sig.matches(prefix))
}

/// Whether a file prefix belongs to a known binary format
pub fn is_binary(prefix: &[u8]) -> bool {
    detect(prefix).is_some()
}

/// Read the start of a file and identify its binary format.
///
/// `Ok(None)` means the file looks like text. An I/O error is reported
/// separately so the caller can decide whether to skip the file.
pub fn sniff_file(path: &Path) -> io::Result<Option<&'static Signature>> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
    Ok(detect(&prefix))
}
