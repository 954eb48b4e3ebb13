use std::path::Path;
use thiserror::Error;

/// The distinct failure kinds a single-image job can report.
///
/// `Ok` itself has no variant here — success is the absence of an
/// `Err`. Every variant corresponds 1:1 to a kind named in the job
/// error contract; CLI and binding layers match on these rather than
/// parsing the display string.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("resize error: {0}")]
    ResizeError(String),

    #[error("encode error: {0}")]
    EncodeError(String),

    #[error("write error: {0}")]
    WriteError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Short phrase used when composing `"<path>: <phrase>"` error strings
    /// for `BatchResult::errors` and the last-error channel.
    pub fn phrase(&self) -> String {
        self.to_string()
    }

    pub fn for_path(path: &Path, err: CoreError) -> String {
        format!("{}: {}", path.display(), err.phrase())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
