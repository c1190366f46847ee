use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadfillError {
    #[error("Search error: {0}")]
    Search(String),

    #[error("Profile fetch error: {0}")]
    ProfileFetch(String),

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
