//! Errors raised by relay backends.
//!
//! None of these ever reach an observer: the dispatcher logs and drops them.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("pin file I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed: {detail}")]
    Command { program: String, detail: String },

    #[error("relay service request failed: {0}")]
    Http(String),

    #[error("relay call timed out after {0:?}")]
    Timeout(Duration),

    #[error("relay unavailable: {0}")]
    Unavailable(String),
}

impl RelayError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            RelayError::Io { .. } => "relay_io",
            RelayError::Command { .. } => "relay_command",
            RelayError::Http(_) => "relay_http",
            RelayError::Timeout(_) => "relay_timeout",
            RelayError::Unavailable(_) => "relay_unavailable",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Http(e.to_string())
    }
}
