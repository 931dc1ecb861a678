//! Typed failures for the pipeline stages.
//!
//! Malformed numeric fields have no variant here: the normalizer turns them
//! into `None` and the row carries on without the field.

use std::path::PathBuf;

/// A remote source could not deliver a usable page.
///
/// Adapters never let this escape `HoldingsSource::fetch`; it is logged and
/// surfaced to callers as "no data".
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("no search result matched '{query}'")]
    NoMatch { query: String },
}

/// A disclosure document did not contain the expected table layout.
///
/// The parse stage skips the document and counts it.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read text from {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("no tables found")]
    NoTables,

    #[error("could not identify security column")]
    NoSecurityColumn,
}

/// The document store failed. Fatal for the running stage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage engine error: {0}")]
    Engine(#[from] fjall::Error),

    #[error("failed to encode or decode a stored document: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("could not open store at {path:?}: {message}")]
    Open { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::Status {
            url: "http://example.com/a".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "http://example.com/a returned HTTP 503");

        let err = ExtractionError::NoSecurityColumn;
        assert_eq!(err.to_string(), "could not identify security column");
    }
}
