use thiserror::Error;

/// Failures outside the parse itself: loading options from disk.
///
/// Problems in question source are never errors; they are reported as
/// [`texbank_syntax::ParseDiagnostic`]s on the parse output.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read options: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid options file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
