use super::{CopyService, ImageGenerationService};
use crate::image::{GeneratedImage, ImageSet};
use crate::models::{Creativity, Tone};
use crate::{Error, Result};
use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::sync::{Arc, Mutex};

/// Shared record of backend invocations, in call order.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: &'static str) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().unwrap().clone()
    }
}

/// Arguments received by [`MockCopyClient::generate_copy`].
#[derive(Debug, Clone, PartialEq)]
pub struct CopyCall {
    pub description: String,
    pub tone: Tone,
    pub temperature: Creativity,
}

#[derive(Clone)]
pub struct MockCopyClient {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<CopyCall>>>,
    failure_status: Option<u16>,
    log: Option<CallLog>,
}

impl MockCopyClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failure_status: None,
            log: None,
        }
    }

    pub fn with_copy_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Fail every call as if the provider answered with `status`.
    pub fn with_failure_status(mut self, status: u16) -> Self {
        self.failure_status = Some(status);
        self
    }

    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<CopyCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCopyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CopyService for MockCopyClient {
    async fn generate_copy(
        &self,
        description: &str,
        tone: Tone,
        temperature: Creativity,
    ) -> Result<String> {
        if let Some(log) = &self.log {
            log.record("copy");
        }

        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(CopyCall {
                description: description.to_string(),
                tone,
                temperature,
            });
            calls.len()
        };

        if let Some(status) = self.failure_status {
            return Err(Error::CopyProvider(format!(
                "OpenRouter API error (status {}): mock failure",
                status
            )));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(format!(
                "- **Headline:** {} and proud\n- **Body:** {}",
                tone.label(),
                description
            ))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockImageGenerationClient {
    prompts: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
    load_failure: bool,
    log: Option<CallLog>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            load_failure: false,
            log: None,
        }
    }

    /// Fail every call with an inference error carrying `message`.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Fail every call as if the diffusion model could not be loaded.
    pub fn with_load_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self.load_failure = true;
        self
    }

    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_images(
        &self,
        prompt: &str,
        count: usize,
        _guidance_scale: f32,
    ) -> Result<ImageSet> {
        if let Some(log) = &self.log {
            log.record("images");
        }
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(message) = &self.failure {
            if self.load_failure {
                return Err(Error::ModelLoad(message.clone()));
            }
            return Err(Error::Inference(message.clone()));
        }

        let images = (0..count)
            .map(|i| {
                let shade = (i * 60 % 256) as u8;
                let img = RgbImage::from_pixel(16, 16, Rgb([shade, 128, 255 - shade]));
                GeneratedImage::from_dynamic(DynamicImage::ImageRgb8(img))
            })
            .collect();
        Ok(ImageSet::new(images))
    }
}
