mod cli;
mod walker;

use clap::Parser;
use cli::Cli;
use machp::report::{FileReport, SliceReport};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

fn slices_of(report: &FileReport) -> Vec<&SliceReport> {
    match (&report.slices, &report.header_slice) {
        (Some(slices), _) => slices.iter().collect(),
        (None, Some(slice)) => vec![slice],
        (None, None) => Vec::new(),
    }
}

fn write_to_output_dir(report: &FileReport, dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for slice in slices_of(report) {
        let path = dir.join(format!("{}.json", slice.sha256));
        let json = serde_json::to_string_pretty(slice)?;
        std::fs::write(path, json)?;
    }
    Ok(())
}

fn process_one(path: &Path, output: Option<&Path>) -> bool {
    let display = path.display().to_string();
    match machp::inspect_file(&display) {
        Ok(report) => {
            info!("parsed {display}");
            match output {
                Some(dir) => {
                    if let Err(e) = write_to_output_dir(&report, dir) {
                        eprintln!("Error parsing file {display}: failed writing output: {e}");
                        return false;
                    }
                }
                None => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error parsing file {display}: failed serializing report: {e}");
                        return false;
                    }
                },
            }
            true
        }
        Err(e) => {
            eprintln!("Error parsing file {display}: {e}");
            false
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let files = walker::collect_files(&cli.path, cli.recursive);
    if files.is_empty() {
        error!("no files found at {}", cli.path.display());
        eprintln!("Error parsing file {}: no such file or directory", cli.path.display());
        return std::process::ExitCode::FAILURE;
    }

    let any_failed = AtomicBool::new(false);
    files.par_iter().for_each(|path| {
        if !process_one(path, cli.output.as_deref()) {
            any_failed.store(true, Ordering::Relaxed);
        }
    });

    if any_failed.load(Ordering::Relaxed) {
        std::process::ExitCode::FAILURE
    } else {
        std::process::ExitCode::SUCCESS
    }
}
