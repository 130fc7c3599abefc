use thiserror::Error;

/// Failures talking to the book catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode catalog response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build catalog client: {0}")]
    Client(#[source] reqwest::Error),
}

impl CatalogError {
    /// Upstream HTTP status, when the catalog answered at all
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CatalogError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
