use thiserror::Error;

/// Failure of a single provider operation.
///
/// Cloneable so that one failed in-flight request can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response, including "city not found".
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// Payload is missing required fields or does not parse.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Provider { status: 404, .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Network(format!("request timed out: {err}"))
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedResponse(err.to_string())
    }
}
