//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Copy provider error: {0}")]
    CopyProvider(String),

    #[error("Diffusion model loading error: {0}")]
    ModelLoad(String),

    #[error("Image inference error: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Errors after which the process cannot serve further generations.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ModelLoad(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
