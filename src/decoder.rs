//! Paktxt archive decoder
//!
//! Decoding is a small state machine over the raw bytes:
//!
//! ```text
//! SeekingBlockStart --start delimiter--> ReadingMetadata
//! ReadingMetadata   --content label-->   ReadingContent
//! ReadingContent    --end delimiter-->   SeekingBlockStart
//! ```
//!
//! Blocks are found only by searching for the exact delimiter strings,
//! so file content may contain anything except the end delimiter itself.

use log::warn;

use crate::archive::{
    Archive, FileRecord, CONTENT_LABEL, END_DELIMITER, EXECUTABLE_LABEL, FILENAME_LABEL,
    START_DELIMITER, TRAILING_NEWLINE_LABEL,
};

/// Fatal format errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No start delimiter anywhere in the input
    NoBlocks,
    /// Input ended before the `content:` label of a block
    UnterminatedMetadata { filename: String },
    /// A block has no end delimiter
    MissingEndDelimiter { filename: String },
    /// Unknown metadata line, only raised in strict mode
    UnexpectedMetadataLine { filename: String, line: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NoBlocks => {
                write!(f, "No file blocks found in paktxt content (missing start delimiter)")
            }
            ParseError::UnterminatedMetadata { filename } => {
                write!(f, "Malformed paktxt content: unexpected end of data during metadata parsing of '{}'", filename)
            }
            ParseError::MissingEndDelimiter { filename } => {
                write!(f, "Malformed paktxt content: missing end delimiter for file block '{}'", filename)
            }
            ParseError::UnexpectedMetadataLine { filename, line } => {
                write!(f, "Unexpected line in metadata block for file '{}': {:?}", filename, line)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Metadata gathered for the block being read
#[derive(Debug, Default)]
struct PendingBlock {
    filename: String,
    is_executable: bool,
    has_trailing_newline: bool,
}

#[derive(Debug)]
enum State {
    SeekingBlockStart,
    ReadingMetadata(PendingBlock),
    ReadingContent(PendingBlock),
}

/// Decodes a paktxt archive
pub struct Decoder {
    /// Reject unknown metadata lines instead of warning
    strict: bool,
}

impl Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Treat unrecognised metadata lines as errors
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Decode an archive.
    ///
    /// Returned records hold the original file bytes: the newline the
    /// encoder adds to files without a trailing newline is removed again.
    /// Blocks without a filename are skipped with a warning.
    pub fn decode(&self, input: &[u8]) -> Result<Archive, ParseError> {
        let mut cursor = find(input, START_DELIMITER.as_bytes()).ok_or(ParseError::NoBlocks)?;
        let mut archive = Archive::new();
        let mut state = State::SeekingBlockStart;

        loop {
            let rest = &input[cursor..];
            state = match state {
                State::SeekingBlockStart => match find(rest, START_DELIMITER.as_bytes()) {
                    None => break,
                    Some(idx) => {
                        cursor += idx + START_DELIMITER.len();
                        cursor += line_terminator_len(&input[cursor..]);
                        State::ReadingMetadata(PendingBlock::default())
                    }
                },

                State::ReadingMetadata(mut block) => {
                    let line_end = rest.iter().position(|&b| b == b'\n').ok_or_else(|| {
                        ParseError::UnterminatedMetadata { filename: block.filename.clone() }
                    })?;
                    cursor += line_end + 1;

                    let raw = &rest[..line_end];
                    let line = String::from_utf8_lossy(raw.strip_suffix(b"\r").unwrap_or(raw));
                    if self.read_metadata_line(&mut block, &line)? {
                        State::ReadingContent(block)
                    } else {
                        State::ReadingMetadata(block)
                    }
                }

                State::ReadingContent(block) => {
                    let end = find(rest, END_DELIMITER.as_bytes()).ok_or_else(|| {
                        ParseError::MissingEndDelimiter { filename: block.filename.clone() }
                    })?;
                    let content = &rest[..end];

                    cursor += end + END_DELIMITER.len();
                    cursor += line_terminator_len(&input[cursor..]);

                    self.finish_block(&mut archive, block, content);
                    State::SeekingBlockStart
                }
            };
        }

        Ok(archive)
    }

    /// Apply one metadata line. Returns true on the content label.
    /// Any line starting with `content:` counts as the label; the rest of it is ignored.
    fn read_metadata_line(&self, block: &mut PendingBlock, line: &str) -> Result<bool, ParseError> {
        if let Some(name) = line.strip_prefix(FILENAME_LABEL) {
            block.filename = name.to_string();
        } else if let Some(value) = line.strip_prefix(EXECUTABLE_LABEL) {
            block.is_executable = value.trim() == "true";
        } else if let Some(value) = line.strip_prefix(TRAILING_NEWLINE_LABEL) {
            block.has_trailing_newline = value.trim() == "true";
        } else if line.starts_with(CONTENT_LABEL) {
            return Ok(true);
        } else if line.trim().is_empty() {
            // Blank lines are allowed between metadata lines
        } else if self.strict {
            return Err(ParseError::UnexpectedMetadataLine {
                filename: block.filename.clone(),
                line: line.to_string(),
            });
        } else {
            warn!("Unexpected line in metadata block for file {:?}: {:?}", block.filename, line);
        }
        Ok(false)
    }

    fn finish_block(&self, archive: &mut Archive, block: PendingBlock, content: &[u8]) {
        if block.filename.is_empty() {
            warn!("Skipping malformed file block (no filename found)");
            return;
        }

        let content = if block.has_trailing_newline {
            content
        } else {
            strip_padding(content)
        };

        let record = FileRecord {
            name: block.filename,
            is_executable: block.is_executable,
            has_trailing_newline: block.has_trailing_newline,
            content: content.to_vec(),
        };
        let name = record.name.clone();
        if archive.upsert_file(record) {
            warn!("Duplicate file block for {}; the later block wins", name);
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Undo the line feed added after content without a trailing newline.
/// A `\r\n` is removed as a whole in case the text passed through a
/// newline-converting transport.
fn strip_padding(content: &[u8]) -> &[u8] {
    content
        .strip_suffix(b"\r\n")
        .or_else(|| content.strip_suffix(b"\n"))
        .unwrap_or(content)
}

/// Length of a leading `\n`, `\r\n` or lone `\r`
fn line_terminator_len(data: &[u8]) -> usize {
    match data {
        [b'\n', ..] => 1,
        [b'\r', b'\n', ..] => 2,
        [b'\r', ..] => 1,
        _ => 0,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    fn block(meta: &str, content: &str) -> String {
        format!("{}\n{}content:\n{}{}\n", START_DELIMITER, meta, content, END_DELIMITER)
    }

    fn roundtrip(records: Vec<FileRecord>) -> Archive {
        let mut archive = Archive::new();
        for r in records {
            archive.add_file(r).unwrap();
        }
        let encoded = Encoder::new().encode(&archive);
        let decoded = Decoder::new().decode(&encoded).unwrap();
        assert_eq!(decoded, archive);
        decoded
    }

    #[test]
    fn test_decode_simple() {
        let input = format!(
            "header text\n\n{}",
            block("filename: a.txt\nexecutable: false\ntrailing_newline: true\n", "hello\n")
        );
        let archive = Decoder::new().decode(input.as_bytes()).unwrap();

        assert_eq!(archive.len(), 1);
        assert_eq!(archive.files[0].name, "a.txt");
        assert_eq!(archive.files[0].content, b"hello\n");
        assert!(!archive.files[0].is_executable);
    }

    #[test]
    fn test_decode_no_blocks() {
        let result = Decoder::new().decode(b"just some text\n");
        assert_eq!(result.unwrap_err(), ParseError::NoBlocks);
    }

    #[test]
    fn test_decode_unterminated_metadata() {
        let input = format!("{}\nfilename: a.txt\nexecutable: true", START_DELIMITER);
        let result = Decoder::new().decode(input.as_bytes());
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnterminatedMetadata { filename: "a.txt".to_string() }
        );
    }

    #[test]
    fn test_decode_missing_end_delimiter() {
        let input = format!("{}\nfilename: a.txt\ncontent:\nbody\n", START_DELIMITER);
        let err = Decoder::new().decode(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MissingEndDelimiter { .. }));
        assert!(err.to_string().contains("missing end delimiter"));
    }

    #[test]
    fn test_roundtrip_trailing_newline() {
        let archive = roundtrip(vec![
            FileRecord::from_raw("with.txt", b"line\n", false),
            FileRecord::from_raw("without.txt", b"line", false),
            FileRecord::from_raw("empty.txt", b"", false),
            FileRecord::from_raw("only-newline.txt", b"\n", false),
            FileRecord::from_raw("double.txt", b"x\n\n", false),
        ]);
        assert_eq!(archive.get("with.txt").unwrap().content, b"line\n");
        assert_eq!(archive.get("without.txt").unwrap().content, b"line");
        assert_eq!(archive.get("empty.txt").unwrap().content, b"");
    }

    #[test]
    fn test_roundtrip_crlf_and_executable() {
        roundtrip(vec![
            FileRecord::from_raw("win.bat", b"@echo off\r\nexit\r\n", true),
            FileRecord::from_raw("win-no-eol.txt", b"a\r\nb", false),
            FileRecord::from_raw("deep/dir/run.sh", b"#!/bin/sh\n", true),
        ]);
    }

    #[test]
    fn test_content_may_contain_labels_and_start_delimiter() {
        let tricky = format!(
            "content:\nfilename: evil.txt\n{}\nstill content\n",
            START_DELIMITER
        );
        let archive = roundtrip(vec![
            FileRecord::from_raw("tricky.md", tricky.as_bytes(), false),
            FileRecord::from_raw("next.txt", b"next", false),
        ]);
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_metadata_last_occurrence_wins() {
        let input = block(
            "filename: first.txt\nexecutable: true\nfilename: second.txt\nexecutable: false\ntrailing_newline: true\n",
            "x\n",
        );
        let archive = Decoder::new().decode(input.as_bytes()).unwrap();
        assert_eq!(archive.files[0].name, "second.txt");
        assert!(!archive.files[0].is_executable);
    }

    #[test]
    fn test_content_label_prefix() {
        let input = format!(
            "{}\nfilename: a.txt\ntrailing_newline: true\ncontent: ignored\nbody\n{}\n",
            START_DELIMITER, END_DELIMITER
        );
        let archive = Decoder::new().with_strict(true).decode(input.as_bytes()).unwrap();
        assert_eq!(archive.files[0].content, b"body\n");
    }

    #[test]
    fn test_blank_and_unknown_metadata_lines_tolerated() {
        let input = block("\nfilename: a.txt\nmode: 0644\n\ntrailing_newline: true\n", "x\n");
        let archive = Decoder::new().decode(input.as_bytes()).unwrap();
        assert_eq!(archive.files[0].name, "a.txt");
    }

    #[test]
    fn test_strict_rejects_unknown_metadata() {
        let input = block("filename: a.txt\nmode: 0644\n", "x\n");
        let err = Decoder::new().with_strict(true).decode(input.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedMetadataLine {
                filename: "a.txt".to_string(),
                line: "mode: 0644".to_string(),
            }
        );
    }

    #[test]
    fn test_block_without_filename_skipped() {
        let input = format!(
            "{}{}",
            block("executable: false\ntrailing_newline: true\n", "orphan\n"),
            block("filename: ok.txt\ntrailing_newline: true\n", "ok\n")
        );
        let archive = Decoder::new().decode(input.as_bytes()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.files[0].name, "ok.txt");
    }

    #[test]
    fn test_crlf_archive() {
        let input = format!(
            "{}\r\nfilename: a.txt\r\nexecutable: true\r\ntrailing_newline: false\r\ncontent:\r\nbody\r\n{}\r\n\r\n",
            START_DELIMITER, END_DELIMITER
        );
        let archive = Decoder::new().decode(input.as_bytes()).unwrap();
        let file = &archive.files[0];
        assert_eq!(file.name, "a.txt");
        assert!(file.is_executable);
        assert_eq!(file.content, b"body");
    }

    #[test]
    fn test_duplicate_blocks_later_wins() {
        let input = format!(
            "{}{}",
            block("filename: a.txt\ntrailing_newline: true\n", "one\n"),
            block("filename: a.txt\ntrailing_newline: true\n", "two\n")
        );
        let archive = Decoder::new().decode(input.as_bytes()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.files[0].content, b"two\n");
    }

    #[test]
    fn test_strip_padding() {
        assert_eq!(strip_padding(b"a\r\n"), b"a");
        assert_eq!(strip_padding(b"a\n"), b"a");
        assert_eq!(strip_padding(b"a\n\n"), b"a\n");
        assert_eq!(strip_padding(b"a"), b"a");
        assert_eq!(strip_padding(b""), b"");
    }

    #[test]
    fn test_line_terminator_len() {
        assert_eq!(line_terminator_len(b"\nx"), 1);
        assert_eq!(line_terminator_len(b"\r\nx"), 2);
        assert_eq!(line_terminator_len(b"\rx"), 1);
        assert_eq!(line_terminator_len(b"x"), 0);
        assert_eq!(line_terminator_len(b""), 0);
    }
}
