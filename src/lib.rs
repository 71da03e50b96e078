//! Generative marketing copywriter - ad copy and product thumbnails from one description
//!
//! A product description, a tone and a creativity setting are turned into
//! markdown ad copy by a hosted chat model, then into three studio-style
//! thumbnails by a locally served diffusion model. Results are shown on a
//! single page or written to disk from the command line.

pub mod ai;
pub mod app;
pub mod copy;
pub mod diffusion;
pub mod error;
pub mod image;
pub mod models;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod server;

pub use error::{Error, Result};
