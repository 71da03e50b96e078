use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";
const REFERER: &str = "https://portfolio.example";
const APP_TITLE: &str = "AI-Marketing-Copywriter";
const MAX_LOGGED_BODY: usize = 2000;

pub struct OpenRouterHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    timeout: Duration,
}

impl OpenRouterHttpClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(request);
        // Without a key the request goes out unauthenticated and the provider rejects it.
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request to OpenRouter: {}", e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            let error_text = truncate_for_log(&error_text, MAX_LOGGED_BODY);
            tracing::error!("OpenRouter API error (status {}): {}", status, error_text);
            return Err(Error::CopyProvider(format!(
                "OpenRouter API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                "Failed to parse OpenRouter response: {}\nBody: {}",
                e,
                truncate_for_log(&body, MAX_LOGGED_BODY)
            );
            Error::CopyProvider(format!("Failed to parse OpenRouter response: {}", e))
        })
    }

    pub async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.post("/v1/chat/completions", &request).await
    }
}

pub(crate) fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc... (truncated)");
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let client = OpenRouterHttpClient::new("key".to_string(), Duration::from_secs(1))
            .with_base_url("http://localhost:9999/api/".to_string());
        assert_eq!(client.base_url, "http://localhost:9999/api");
    }
}
