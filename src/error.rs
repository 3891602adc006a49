//! Error taxonomy for the decoding pipeline
use thiserror::Error;

/// Errors produced while locating, opening or decoding a Mach-O file
#[derive(Debug, Error)]
pub enum MachpError {
    /// Opening the input failed
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Magic mismatch or a structurally impossible field at top level
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Bounds violation, truncated record, or offset arithmetic overflow
    #[error("parsing error: {0}")]
    Parsing(String),

    /// Reserved for features not exercised by the current pipeline
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<std::io::Error> for MachpError {
    fn from(e: std::io::Error) -> Self {
        MachpError::FileNotFound(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MachpError>;
