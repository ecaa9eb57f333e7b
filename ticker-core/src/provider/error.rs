use thiserror::Error;

/// Errors surfaced by the upstream quote provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The upstream answered 200 with a near-empty body, which it does both
    /// when throttling and for unknown symbols.
    #[error("rate limit reached or symbol not found")]
    RateLimited,

    /// The request never produced a usable response
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The response body did not match the expected envelope
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether this error should push the ingestion scheduler into backoff.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}
