use thiserror::Error;

pub type Result<T> = std::result::Result<T, CustomSearchError>;

#[derive(Debug, Error)]
pub enum CustomSearchError {
    #[error("Google API is not configured: set the API key and search engine ID in settings")]
    MissingCredentials,

    /// Message taken verbatim from the provider's `error` payload.
    #[error("{0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for CustomSearchError {
    fn from(err: reqwest::Error) -> Self {
        CustomSearchError::Network(err.to_string())
    }
}
