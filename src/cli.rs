//! Command-line argument surface
use clap::Parser;
use std::path::PathBuf;

/// Inspects Mach-O binaries, dylibs and fat archives and emits a normalized
/// JSON report per decoded slice.
#[derive(Debug, Parser)]
#[command(name = "machp", version, about)]
pub struct Cli {
    /// File or directory to inspect
    pub path: PathBuf,

    /// Recurse into `path` if it names a directory
    #[arg(short, long)]
    pub recursive: bool,

    /// Write one `<sha256>.json` file per decoded slice into this directory
    /// instead of printing reports to standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Raise the log filter to debug for this process
    #[arg(long)]
    pub debug: bool,
}
