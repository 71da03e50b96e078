//! Application orchestration: copy first, then thumbnails.

use crate::ai::{CopyService, ImageGenerationService, OpenRouterCopyClient};
use crate::copy::CopyResult;
use crate::diffusion::{DiffusionImageClient, HttpPipelineLoader, PipelineCache};
use crate::image::ImageSet;
use crate::models::{Config, GenerationRequest};
use crate::progress::{Progress, Stage};
use crate::{prompts, Error, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const IMAGE_COUNT: usize = 3;

/// Outcome of one user-triggered generation.
///
/// The copy is always present; the image stage may have failed on its own.
pub struct Generation {
    pub id: Uuid,
    pub request: GenerationRequest,
    pub copy: CopyResult,
    pub images: Result<ImageSet>,
}

/// Coordinates copy generation and image rendering for one request at a time.
pub struct App {
    copy: Arc<dyn CopyService>,
    image_gen: Arc<dyn ImageGenerationService>,
    guidance_scale: f32,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub copy: Arc<dyn CopyService>,
    pub image_gen: Arc<dyn ImageGenerationService>,
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, guidance_scale: f32) -> Self {
        Self {
            copy: services.copy,
            image_gen: services.image_gen,
            guidance_scale,
        }
    }

    /// Construct an app from configuration (`Config::from_env`).
    ///
    /// The diffusion pipeline is not loaded here; it is built on first use.
    pub fn from_config(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across both backends.
        let http_client = reqwest::Client::builder().build()?;

        info!(
            "Copy provider: OpenRouter (model: {}, base: {})",
            config.copy_model, config.copy_api_base
        );
        let copy = OpenRouterCopyClient::new_with_client(
            config.openrouter_api_key.clone(),
            config.copy_model.clone(),
            config.copy_timeout,
            http_client.clone(),
        )
        .with_base_url(config.copy_api_base.clone());

        info!(
            "Image provider: diffusion server {} (model: {})",
            config.diffusion_api_base, config.diffusion_model
        );
        let loader = HttpPipelineLoader::new(
            config.diffusion_api_base.clone(),
            config.diffusion_model.clone(),
            config.diffusion_device,
            config.diffusion_timeout,
            http_client,
        );
        let cache = Arc::new(PipelineCache::new(Box::new(loader)));

        Ok(Self::with_services(
            AppServices {
                copy: Arc::new(copy),
                image_gen: Arc::new(DiffusionImageClient::new(cache)),
            },
            config.guidance_scale,
        ))
    }

    /// Run copy generation, then image generation, for a validated request.
    ///
    /// Fails only when the request is invalid or the copy stage fails; an
    /// image-stage failure is returned inside [`Generation::images`].
    pub async fn handle_request(
        &self,
        request: GenerationRequest,
        progress: &dyn Progress,
    ) -> Result<Generation> {
        // Requests built through the constructor are already non-blank.
        if crate::models::is_blank(request.description()) {
            return Err(Error::Validation(
                "product description must not be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        info!(
            "[{}] Generating {} copy (creativity {})",
            id,
            request.tone(),
            request.creativity()
        );

        progress.started(Stage::Copy);
        let copy_text = self
            .copy
            .generate_copy(request.description(), request.tone(), request.creativity())
            .await;
        progress.finished(Stage::Copy, copy_text.is_ok());
        let copy_text = copy_text.map_err(|e| {
            error!("[{}] Copy generation failed: {}", id, e);
            e
        })?;

        let copy = CopyResult::new(copy_text);
        info!("[{}] Generated copy ({} chars)", id, copy.text().len());
        for warning in copy.warnings() {
            warn!("[{}] Copy format: {}", id, warning);
        }

        progress.started(Stage::Images);
        let images = self
            .render_images(prompts::image_prompt(request.description()))
            .await;
        progress.finished(Stage::Images, images.is_ok());
        match &images {
            Ok(set) => info!("[{}] Rendered {} thumbnails", id, set.len()),
            Err(e) => error!("[{}] Image generation failed: {}", id, e),
        }

        Ok(Generation {
            id,
            request,
            copy,
            images,
        })
    }

    /// Render thumbnails on a spawned task and join it before returning.
    async fn render_images(&self, prompt: String) -> Result<ImageSet> {
        let image_gen = Arc::clone(&self.image_gen);
        let guidance_scale = self.guidance_scale;
        let task = tokio::spawn(async move {
            image_gen
                .generate_images(&prompt, IMAGE_COUNT, guidance_scale)
                .await
        });

        task.await
            .map_err(|e| Error::Invariant(format!("Image generation task join error: {}", e)))?
    }
}
