use thiserror::Error;

use murmur_shared::{ApiError, SessionError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("Nothing to publish: write something or attach media")]
    Empty,

    #[error("Publish failed: {0}")]
    Api(#[from] ApiError),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("Item not found: {0}")]
    ItemNotFound(String),
}
