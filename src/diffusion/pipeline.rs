use super::device::{DeviceChoice, Precision};
use crate::ai::openrouter::client::truncate_for_log;
use crate::image::GeneratedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info};

pub const INFERENCE_STEPS: u32 = 30;
pub const IMAGE_SIZE: &str = "512x512";
const MAX_LOGGED_BODY: usize = 2000;

/// Per-call rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub count: usize,
    pub steps: u32,
    pub guidance_scale: f32,
}

impl RenderParams {
    pub fn new(count: usize, guidance_scale: f32) -> Self {
        Self {
            count,
            steps: INFERENCE_STEPS,
            guidance_scale,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::Inference(
                "image count must be at least 1".to_string(),
            ));
        }
        if self.steps == 0 {
            return Err(Error::Inference(
                "denoising steps must be at least 1".to_string(),
            ));
        }
        if !self.guidance_scale.is_finite() || self.guidance_scale <= 0.0 {
            return Err(Error::Inference(format!(
                "guidance scale must be a positive number, got {}",
                self.guidance_scale
            )));
        }
        Ok(())
    }
}

/// A constructed text-to-image pipeline.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn model_id(&self) -> &str;
    fn precision(&self) -> Precision;
    async fn render(&self, prompt: &str, params: &RenderParams) -> Result<Vec<GeneratedImage>>;
}

/// Builds a [`Pipeline`]; invoked at most once per process by the cache.
#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Pipeline>>;
}

/// Loads the pipeline from a local OpenAI-compatible diffusion server.
pub struct HttpPipelineLoader {
    client: Client,
    base_url: String,
    model_id: String,
    device: DeviceChoice,
    timeout: Duration,
}

impl HttpPipelineLoader {
    pub fn new(
        base_url: String,
        model_id: String,
        device: DeviceChoice,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id,
            device,
            timeout,
        }
    }

    async fn served_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::ModelLoad(format!("diffusion server unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body = truncate_for_log(&body, MAX_LOGGED_BODY);
            return Err(Error::ModelLoad(format!(
                "diffusion server refused model listing (status {}): {}",
                status, body
            )));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| Error::ModelLoad(format!("invalid model listing: {}", e)))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl PipelineLoader for HttpPipelineLoader {
    async fn load(&self) -> Result<Arc<dyn Pipeline>> {
        let device = self.device.resolve();
        let precision = Precision::for_device(device);
        info!(
            "Loading diffusion pipeline {} on {} ({})",
            self.model_id, device, precision
        );

        let started = Instant::now();
        let models = self.served_models().await?;
        if !models.iter().any(|id| id == &self.model_id) {
            error!(
                "Model {} is not served by {} (available: {})",
                self.model_id,
                self.base_url,
                models.join(", ")
            );
            return Err(Error::ModelLoad(format!(
                "model weights for {} are not available",
                self.model_id
            )));
        }
        info!("Diffusion pipeline ready in {:.1?}", started.elapsed());

        Ok(Arc::new(HttpPipeline {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model_id: self.model_id.clone(),
            precision,
            timeout: self.timeout,
            inference_lock: Mutex::new(()),
        }))
    }
}

pub struct HttpPipeline {
    client: Client,
    base_url: String,
    model_id: String,
    precision: Precision,
    timeout: Duration,
    inference_lock: Mutex<()>,
}

impl HttpPipeline {
    async fn fetch_bytes(&self, data: &ImageData) -> Result<Vec<u8>> {
        if let Some(b64_json) = &data.b64_json {
            base64::engine::general_purpose::STANDARD
                .decode(b64_json)
                .map_err(|e| Error::Inference(format!("Failed to decode base64 image: {}", e)))
        } else if let Some(url) = &data.url {
            Ok(self
                .client
                .get(url)
                .timeout(self.timeout)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?
                .to_vec())
        } else {
            Err(Error::Inference(
                "No image data (neither base64 nor URL) in response".to_string(),
            ))
        }
    }
}

#[async_trait]
impl Pipeline for HttpPipeline {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn precision(&self) -> Precision {
        self.precision
    }

    async fn render(&self, prompt: &str, params: &RenderParams) -> Result<Vec<GeneratedImage>> {
        params.validate()?;

        let request = ImageGenerationRequest {
            model: &self.model_id,
            prompt,
            n: params.count,
            size: IMAGE_SIZE,
            response_format: "b64_json",
            step: params.steps,
            guidance_scale: params.guidance_scale,
            precision: self.precision,
        };

        // The pipeline is not safe for concurrent inference.
        let _guard = self.inference_lock.lock().await;
        let started = Instant::now();

        let url = format!("{}/v1/images/generations", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to diffusion server: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            let error_text = truncate_for_log(&error_text, MAX_LOGGED_BODY);
            error!("Diffusion server error (status {}): {}", status, error_text);
            return Err(Error::Inference(format!(
                "diffusion server error (status {}): {}",
                status, error_text
            )));
        }

        let body: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse diffusion response: {}", e)))?;

        if body.data.len() != params.count {
            return Err(Error::Inference(format!(
                "expected {} images, pipeline returned {}",
                params.count,
                body.data.len()
            )));
        }

        let mut images = Vec::with_capacity(body.data.len());
        for data in &body.data {
            let bytes = self.fetch_bytes(data).await?;
            let image = GeneratedImage::from_bytes(&bytes)
                .map_err(|e| Error::Inference(format!("undecodable image from pipeline: {}", e)))?;
            images.push(image);
        }

        info!(
            "Rendered {} images ({} steps, guidance {}) in {:.1?}",
            images.len(),
            params.steps,
            params.guidance_scale,
            started.elapsed()
        );
        Ok(images)
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: usize,
    size: &'static str,
    response_format: &'static str,
    step: u32,
    guidance_scale: f32,
    precision: Precision,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "runwayml/stable-diffusion-v1-5";

    fn png_b64() -> String {
        let img = RgbImage::from_pixel(8, 8, image::Rgb([200, 180, 40]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn loader(server: &MockServer) -> HttpPipelineLoader {
        HttpPipelineLoader::new(
            server.uri(),
            MODEL.to_string(),
            DeviceChoice::Cpu,
            Duration::from_secs(5),
            Client::new(),
        )
    }

    async fn mount_models(server: &MockServer, ids: &[&str]) {
        let data: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({ "id": id, "object": "model" }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data })),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_render_params_validation() {
        assert!(RenderParams::new(3, 7.5).validate().is_ok());
        assert_eq!(RenderParams::new(3, 7.5).steps, 30);
        assert!(matches!(
            RenderParams::new(0, 7.5).validate(),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            RenderParams::new(3, f32::NAN).validate(),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            RenderParams::new(3, -1.0).validate(),
            Err(Error::Inference(_))
        ));
    }

    #[tokio::test]
    async fn test_load_succeeds_when_model_is_served() {
        let server = MockServer::start().await;
        mount_models(&server, &["other-model", MODEL]).await;

        let pipeline = loader(&server).load().await.unwrap();
        assert_eq!(pipeline.model_id(), MODEL);
        assert_eq!(pipeline.precision(), Precision::Full);
    }

    #[tokio::test]
    async fn test_load_fails_when_model_is_missing() {
        let server = MockServer::start().await;
        mount_models(&server, &["other-model"]).await;

        let err = loader(&server).load().await.err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_load_fails_when_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let err = loader(&server).load().await.err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[tokio::test]
    async fn test_render_sends_parameters_and_decodes_images() {
        let server = MockServer::start().await;
        mount_models(&server, &[MODEL]).await;

        let b64 = png_b64();
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(body_partial_json(serde_json::json!({
                "model": MODEL,
                "prompt": "a lamp",
                "n": 3,
                "step": 30,
                "guidance_scale": 7.5,
                "precision": "fp32",
                "response_format": "b64_json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "b64_json": b64 }, { "b64_json": b64 }, { "b64_json": b64 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = loader(&server).load().await.unwrap();
        let images = pipeline
            .render("a lamp", &RenderParams::new(3, 7.5))
            .await
            .unwrap();
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|img| img.width() == 8 && img.height() == 8));
    }

    #[tokio::test]
    async fn test_render_rejects_wrong_image_count() {
        let server = MockServer::start().await;
        mount_models(&server, &[MODEL]).await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "b64_json": png_b64() }]
            })))
            .mount(&server)
            .await;

        let pipeline = loader(&server).load().await.unwrap();
        let err = pipeline
            .render("a lamp", &RenderParams::new(3, 7.5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_render_surfaces_server_rejection() {
        let server = MockServer::start().await;
        mount_models(&server, &[MODEL]).await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad guidance"))
            .mount(&server)
            .await;

        let pipeline = loader(&server).load().await.unwrap();
        let err = pipeline
            .render("a lamp", &RenderParams::new(3, 7.5))
            .await
            .unwrap_err();
        match err {
            Error::Inference(message) => assert!(message.contains("bad guidance")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_long_error_bodies_are_truncated() {
        let server = MockServer::start().await;
        mount_models(&server, &[MODEL]).await;

        let huge = "x".repeat(10_000);
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(500).set_body_string(huge.clone()))
            .mount(&server)
            .await;

        let pipeline = loader(&server).load().await.unwrap();
        let err = pipeline
            .render("a lamp", &RenderParams::new(3, 7.5))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.ends_with("... (truncated)"));
        assert!(message.len() < 2200);

        let listing = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(503).set_body_string(huge))
            .mount(&listing)
            .await;
        let err = loader(&listing).load().await.err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.to_string().len() < 2200);
    }
}
