use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitewatchError {
    #[error("{0}")]
    Validation(String),

    #[error("Domain is already tracked: {0}")]
    DuplicateDomain(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
