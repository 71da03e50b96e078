//! Local text-to-image diffusion pipeline
//!
//! The pipeline is built once per process (device and precision picked at
//! construction time) and shared by reference; inference calls on it are
//! serialized.

pub mod cache;
pub mod device;
pub mod pipeline;

pub use cache::PipelineCache;
pub use device::{Device, DeviceChoice, Precision};
pub use pipeline::{HttpPipelineLoader, Pipeline, PipelineLoader, RenderParams, INFERENCE_STEPS};

use crate::ai::ImageGenerationService;
use crate::image::ImageSet;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub struct DiffusionImageClient {
    cache: Arc<PipelineCache>,
}

impl DiffusionImageClient {
    pub fn new(cache: Arc<PipelineCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<PipelineCache> {
        &self.cache
    }
}

#[async_trait]
impl ImageGenerationService for DiffusionImageClient {
    async fn generate_images(
        &self,
        prompt: &str,
        count: usize,
        guidance_scale: f32,
    ) -> Result<ImageSet> {
        let params = RenderParams::new(count, guidance_scale);
        // Bad parameters must not trigger the expensive model load.
        params.validate()?;

        let pipeline = self.cache.get().await?;
        let images = pipeline.render(prompt, &params).await?;
        if images.len() != count {
            return Err(Error::Inference(format!(
                "expected {} images, pipeline returned {}",
                count,
                images.len()
            )));
        }
        Ok(ImageSet::new(images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GeneratedImage;
    use image::{DynamicImage, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPipeline {
        returned: usize,
    }

    #[async_trait]
    impl Pipeline for FixedPipeline {
        fn model_id(&self) -> &str {
            "fixed"
        }

        fn precision(&self) -> Precision {
            Precision::Full
        }

        async fn render(&self, _prompt: &str, _params: &RenderParams) -> Result<Vec<GeneratedImage>> {
            Ok((0..self.returned)
                .map(|_| GeneratedImage::from_dynamic(DynamicImage::ImageRgb8(RgbImage::new(2, 2))))
                .collect())
        }
    }

    struct FixedLoader {
        returned: usize,
        loads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PipelineLoader for FixedLoader {
        async fn load(&self) -> Result<Arc<dyn Pipeline>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FixedPipeline {
                returned: self.returned,
            }))
        }
    }

    fn client(returned: usize) -> (DiffusionImageClient, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = FixedLoader {
            returned,
            loads: Arc::clone(&loads),
        };
        let cache = Arc::new(PipelineCache::new(Box::new(loader)));
        (DiffusionImageClient::new(cache), loads)
    }

    #[tokio::test]
    async fn test_returns_requested_count() {
        let (client, loads) = client(3);

        let set = client.generate_images("a lamp", 3, 7.5).await.unwrap();
        assert_eq!(set.len(), 3);

        client.generate_images("a chair", 3, 7.5).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_parameters_skip_pipeline_construction() {
        let (client, loads) = client(3);

        let err = client.generate_images("a lamp", 0, 7.5).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        let err = client.generate_images("a lamp", 3, f32::INFINITY).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));

        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(!client.cache().is_loaded());
    }

    #[tokio::test]
    async fn test_count_mismatch_is_an_inference_error() {
        let (client, _) = client(2);
        let err = client.generate_images("a lamp", 3, 7.5).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }
}
