// src/error.rs

use arrow::error::ArrowError;
use thiserror::Error;

/// Everything that can go wrong between "ask the publisher" and "have a
/// parsed table". All variants are recoverable by falling back to the cache.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unreadable archive {filename}: {source}")]
    Archive {
        filename: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {0} contains no CSV member")]
    NoCsvMember(String),

    #[error("reading {member} from {filename}: {source}")]
    Member {
        filename: String,
        member: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {member}: {source}")]
    Parse {
        member: String,
        #[source]
        source: ArrowError,
    },

    #[error("bad URL {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    /// Worth retrying: network trouble and server-side statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
