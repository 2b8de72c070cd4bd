// src/provider/error.rs
// Shared failure taxonomy for every external collaborator call
// (status queries, target health queries, alert delivery).

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    #[error("delivery to channel {channel} failed: {message}")]
    Delivery { channel: String, message: String },

    #[error("failed to encode alert payload: {0}")]
    Encode(String),
}

impl ProviderError {
    pub fn transport(endpoint: impl Into<String>, err: &reqwest::Error) -> Self {
        ProviderError::Transport {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }

    pub fn malformed(endpoint: impl Into<String>, err: &reqwest::Error) -> Self {
        ProviderError::Malformed {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }
}
