//! Paktxt archive encoder

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::archive::{
    Archive, FileRecord, CONTENT_LABEL, END_DELIMITER, EXECUTABLE_LABEL, FILENAME_LABEL,
    PAKTXT_HEADER, START_DELIMITER, TRAILING_NEWLINE_LABEL,
};

/// Encodes an archive into paktxt text
pub struct Encoder {
    // Currently stateless, but reserved for future options
}

impl Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {}
    }

    /// Encode an archive to bytes.
    ///
    /// File content is copied verbatim, so the output is only valid UTF-8
    /// when every file is.
    pub fn encode(&self, archive: &Archive) -> Vec<u8> {
        let size = archive.files.iter().map(|f| f.content.len() + 256).sum::<usize>();
        let mut output = Vec::with_capacity(PAKTXT_HEADER.len() + size);

        output.extend_from_slice(PAKTXT_HEADER.as_bytes());
        for file in &archive.files {
            self.encode_file(&mut output, file);
        }

        output
    }

    /// Encode a single file block
    fn encode_file(&self, output: &mut Vec<u8>, file: &FileRecord) {
        push_line(output, START_DELIMITER);
        push_line(output, &format!("{}{}", FILENAME_LABEL, file.name));
        push_line(output, &format!("{}{}", EXECUTABLE_LABEL, file.is_executable));
        push_line(output, &format!("{}{}", TRAILING_NEWLINE_LABEL, file.has_trailing_newline));
        push_line(output, CONTENT_LABEL);

        output.extend_from_slice(&file.content);
        // The end delimiter must start its own line
        if !file.has_trailing_newline {
            output.push(b'\n');
        }

        push_line(output, END_DELIMITER);
        output.push(b'\n');
    }

    /// Encode an archive directly to a writer
    pub fn encode_to_writer<W: Write>(&self, archive: &Archive, mut writer: W) -> Result<()> {
        writer.write_all(&self.encode(archive))?;
        writer.flush()?;
        Ok(())
    }

    /// Encode an archive to a file, replacing any existing content
    pub fn encode_to_file(&self, archive: &Archive, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file {}", path.display()))?;
        self.encode_to_writer(archive, BufWriter::new(file))
            .with_context(|| format!("Failed to write to file {}", path.display()))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

fn push_line(output: &mut Vec<u8>, line: &str) {
    output.extend_from_slice(line.as_bytes());
    output.push(b'\n');
}
