//! Crate-wide error types.

use thiserror::Error;

pub type HotstepResult<T> = Result<T, HotstepError>;

#[derive(Debug, Error)]
pub enum HotstepError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("time format error: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("log error: {0}")]
    Log(String),

    /// Graceful termination requested by the script's `exit` step. The runner
    /// treats this as normal completion; everything else propagates.
    #[error("script requested exit with code {code}")]
    EarlyExit { code: i32 },
}
