use super::client::OpenRouterHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::CopyService;
use crate::models::{Creativity, Tone};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenRouterCopyClient {
    http: OpenRouterHttpClient,
    model: String,
}

impl OpenRouterCopyClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, DEFAULT_TIMEOUT, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: OpenRouterHttpClient::new_with_client(api_key, timeout, client),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl CopyService for OpenRouterCopyClient {
    async fn generate_copy(
        &self,
        description: &str,
        tone: Tone,
        temperature: Creativity,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompts::COPY_SYSTEM),
                ChatMessage::user(prompts::copy_prompt(description, tone)),
            ],
            temperature: temperature.value(),
        };

        tracing::debug!(
            "Requesting {} copy from {} (temperature {})",
            tone,
            self.model,
            temperature
        );
        let response = self.http.chat_completion(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::CopyProvider("No response from OpenRouter chat API".to_string()))
    }
}
