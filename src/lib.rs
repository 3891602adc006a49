//! Mach-O binary inspector: decodes fat-archive structure, headers, load
//! commands, segments/sections, symbol tables, dylib references and
//! embedded code signatures into a normalized report.
pub mod byte_reader;
pub mod codesign;
pub mod digest;
pub mod entropy;
pub mod error;
pub mod macho;
pub mod report;

use tracing::{instrument, warn};

pub use error::{MachpError, Result};
pub use report::FileReport;

/// Reads `path` and decodes it into a [`FileReport`]. This is the single
/// entry point used by both single-file and recursive CLI modes; it is
/// reentrant and touches no shared mutable state, so callers may invoke it
/// concurrently across distinct files.
#[instrument(level = "debug", skip_all, fields(path = %path))]
pub fn inspect_file(path: &str) -> Result<FileReport> {
    let bytes = std::fs::read(path).map_err(|e| MachpError::FileNotFound(format!("{path}: {e}")))?;
    match report::build(path, &bytes) {
        Ok(report) => Ok(report),
        Err(e) => {
            warn!(error = %e, "failed to decode {path}");
            Err(e)
        }
    }
}
