//! Generation backends for marketing copy and product thumbnails
//!
//! Copy comes from an OpenRouter chat-completion model; thumbnails come from
//! a local diffusion pipeline (see [`crate::diffusion`]). Both sit behind the
//! traits below so the orchestrator can be exercised with mocks.

pub mod mock;
pub mod openrouter;

pub use mock::{CallLog, MockCopyClient, MockImageGenerationClient};
pub use openrouter::OpenRouterCopyClient;

use crate::image::ImageSet;
use crate::models::{Creativity, Tone};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CopyService: Send + Sync {
    /// Draft ad copy for `description`; returns the model's text verbatim.
    async fn generate_copy(
        &self,
        description: &str,
        tone: Tone,
        temperature: Creativity,
    ) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Render exactly `count` images for `prompt`, in generation order.
    async fn generate_images(
        &self,
        prompt: &str,
        count: usize,
        guidance_scale: f32,
    ) -> Result<ImageSet>;
}
