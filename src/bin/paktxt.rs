//! paktxt CLI
//!
//! Pack a directory into a .paktxt archive and restore it again.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use paktxt::{
    list, output_path, pack_archive, unpack, Archive, Encoder, PackOptions, PatternList, UnpackOptions,
};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paktxt")]
#[command(version)]
#[command(about = "Consolidate text files into one archive and restore them")]
struct Cli {
    /// Show debug output, including why files were skipped
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack files into an archive (clipboard or file)
    Pack {
        /// Copy the archive to the clipboard
        #[arg(short = 'b', long, conflicts_with = "output_file", required_unless_present = "output_file")]
        clipboard: bool,

        /// Output file; ".paktxt" is appended when it has no extension
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// Comma-separated glob patterns of files to exclude (e.g. '*.md,temp/*')
        #[arg(short, long, default_value = "")]
        exclude: String,

        /// Comma-separated glob patterns; only matching files are packed
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Directory to pack instead of the current directory
        #[arg(short = 'w', long, default_value = ".")]
        working_dir: PathBuf,
    },

    /// Restore files from an archive (clipboard or file)
    Unpack {
        /// Read the archive from the clipboard
        #[arg(short = 'b', long, conflicts_with = "paktxt_file", required_unless_present = "paktxt_file")]
        clipboard: bool,

        /// Archive file to restore
        #[arg(short = 'i', long)]
        paktxt_file: Option<PathBuf>,

        /// Comma-separated glob patterns of files not to restore
        #[arg(short, long, default_value = "")]
        exclude: String,

        /// Comma-separated glob patterns; only matching files are restored
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Directory to restore into instead of the current directory
        #[arg(short = 'w', long, default_value = ".")]
        working_dir: PathBuf,

        /// Fail on unknown metadata lines instead of warning
        #[arg(long)]
        strict: bool,
    },

    /// List the files in an archive
    List {
        /// Read the archive from the clipboard
        #[arg(short = 'b', long, conflicts_with = "paktxt_file", required_unless_present = "paktxt_file")]
        clipboard: bool,

        /// Archive file to list
        #[arg(short = 'i', long)]
        paktxt_file: Option<PathBuf>,

        /// Also show flags and sizes
        #[arg(short, long)]
        long: bool,
    },
}

/// Where archive text comes from
#[derive(Debug)]
enum Source {
    Clipboard,
    File(PathBuf),
}

impl Source {
    fn new(clipboard: bool, file: Option<PathBuf>) -> Result<Self> {
        match (clipboard, file) {
            (true, None) => Ok(Source::Clipboard),
            (false, Some(path)) => Ok(Source::File(path)),
            _ => bail!("Exactly one of --clipboard or --paktxt-file is required"),
        }
    }

    fn read(&self) -> Result<Vec<u8>> {
        match self {
            Source::Clipboard => {
                info!("Reading content from clipboard...");
                let text = cli_clipboard::get_contents()
                    .map_err(|e| anyhow!("Failed to read from clipboard: {}", e))?;
                if text.is_empty() {
                    bail!("Clipboard content is empty; no parsable paktxt data found");
                }
                Ok(text.into_bytes())
            }
            Source::File(path) => {
                info!("Reading content from file '{}'...", path.display());
                fs::read(path)
                    .with_context(|| format!("Failed to read from paktxt file '{}'", path.display()))
            }
        }
    }
}

/// Where archive text goes
#[derive(Debug)]
enum Sink {
    Clipboard,
    File(PathBuf),
}

impl Sink {
    fn new(clipboard: bool, file: Option<PathBuf>) -> Result<Self> {
        match (clipboard, file) {
            (true, None) => Ok(Sink::Clipboard),
            (false, Some(path)) => Ok(Sink::File(output_path(&path))),
            _ => bail!("Exactly one of --clipboard or --output-file is required"),
        }
    }

    fn write(&self, archive: &Archive) -> Result<()> {
        let encoder = Encoder::new();
        match self {
            Sink::Clipboard => {
                let text = String::from_utf8(encoder.encode(archive)).map_err(|_| {
                    anyhow!("Archive contains non-UTF-8 content and cannot be copied to the clipboard; use --output-file instead")
                })?;
                cli_clipboard::set_contents(text)
                    .map_err(|e| anyhow!("Failed to copy to clipboard: {}", e))?;
                info!("Content successfully copied to clipboard.");
            }
            Sink::File(path) => {
                encoder.encode_to_file(archive, path)?;
                info!("Content successfully written to {}.", path.display());
            }
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Pack { clipboard, output_file, exclude, filter, working_dir } => {
            let sink = Sink::new(clipboard, output_file)?;
            let options = PackOptions::new(working_dir)
                .with_exclude(PatternList::parse(&exclude))
                .with_filter(PatternList::parse(&filter));
            let archive = pack_archive(&options).context("Error during pack operation")?;
            info!("Packed {} files", archive.len());
            sink.write(&archive)?;
        }
        Commands::Unpack { clipboard, paktxt_file, exclude, filter, working_dir, strict } => {
            let input = Source::new(clipboard, paktxt_file)?.read()?;
            let options = UnpackOptions::new(working_dir)
                .with_exclude(PatternList::parse(&exclude))
                .with_filter(PatternList::parse(&filter))
                .with_strict(strict);
            unpack(&input, &options).context("Error restoring files")?;
            println!("Files restored successfully.");
        }
        Commands::List { clipboard, paktxt_file, long } => {
            let input = Source::new(clipboard, paktxt_file)?.read()?;
            let archive = list(&input)?;
            for file in &archive.files {
                if long {
                    let exec = if file.is_executable { "x" } else { "-" };
                    let eol = if file.has_trailing_newline { "eol" } else { "noeol" };
                    println!("{}  {:5}  {:>8}  {}", exec, eol, file.content.len(), file.name);
                } else {
                    println!("{}", file.name);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}
