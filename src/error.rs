//! Error types for the update agent
//!
//! None of these are fatal to the agent itself: the cycle logs them and the
//! scheduler keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Failures the agent can hit during an update cycle
#[derive(Debug, Error)]
pub enum AgentError {
    /// The release endpoint or download could not be reached, or answered
    /// with a non-success status
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The release metadata could not be decoded
    #[error("malformed release data: {0}")]
    Parse(String),

    /// A persisted file (version record, downloaded artifact) could not be
    /// written
    #[error("storage failure on {}: {}", .path.display(), .source)]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The installer artifact could not be launched or exited unsuccessfully
    #[error("install failed: {0}")]
    Install(String),

    /// The HTTP client could not be constructed
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}
