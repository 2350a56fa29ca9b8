use thiserror::Error;

use crate::request::RequestError;

#[derive(Debug, Error)]
pub enum PanoError {
    #[error("No API key configured.\n\nAdd one to the [photos] section of {0}")]
    MissingApiKey(String),

    #[error("{0}")]
    Request(#[from] RequestError),

    #[error("Failed to save image: {0}")]
    Save(#[from] image::ImageError),

    #[error("Request worker stopped without a response")]
    WorkerGone,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
