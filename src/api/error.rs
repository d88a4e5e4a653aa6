use thiserror::Error;

use super::types::LotId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("API request failed: {status} - {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Lot {0} not found")]
    LotNotFound(LotId),
}

impl StoreError {
    /// Connectivity problems are shown as "offline" rather than as an error
    pub fn is_offline(&self) -> bool {
        match self {
            StoreError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e)
        } else {
            StoreError::Network(e)
        }
    }
}
