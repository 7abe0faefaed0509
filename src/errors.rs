use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

/// Every failure is terminal for the run.
#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("environment variable {var} must hold a GitHub token with traffic read access")]
    MissingCredential { var: &'static str },

    #[error("GitHub token contains characters not allowed in an HTTP header")]
    InvalidCredential,

    #[error("invalid API base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub returned {status} for {endpoint}")]
    Upstream { endpoint: String, status: StatusCode },

    #[error("unexpected response body from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}:{line}: {message}", .path.display())]
    Persistence {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("failed to write report {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrafficError {
    pub fn persistence(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = TrafficError> = std::result::Result<T, E>;
