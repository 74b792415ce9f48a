//! Meme enrichment via a vision-capable captioning model.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::EnrichmentError;
use crate::models::{OpenAiConfig, RawMeme};

/// Capability interface for generating a descriptive caption for one meme.
///
/// Failures are per-item: the pipeline degrades a failed item's description
/// to the empty string and keeps going.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn describe(&self, meme: &RawMeme) -> Result<String, EnrichmentError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<serde_json::Value>,
}

/// Captioner backed by OpenAI chat completions with image input.
pub struct OpenAiCaptioner {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiCaptioner {
    pub fn new(config: &OpenAiConfig) -> Result<Self, EnrichmentError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            EnrichmentError::ProviderError("missing OpenAI API key".to_string())
        })?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| EnrichmentError::ProviderError(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.caption_model.clone(),
            max_tokens: config.max_caption_tokens,
        })
    }
}

#[async_trait]
impl Enricher for OpenAiCaptioner {
    async fn describe(&self, meme: &RawMeme) -> Result<String, EnrichmentError> {
        let prompt = format!(
            "Generate a detailed description of this meme. Title: {}",
            meme.title
        );

        let body = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": meme.image_url } },
                ],
            })],
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::ProviderError(format!(
                "status {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::InvalidResponse(e.to_string()))?;

        let caption = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| {
                EnrichmentError::InvalidResponse("response carried no caption".to_string())
            })?;

        Ok(caption.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captioner_creation() {
        let config = OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let captioner = OpenAiCaptioner::new(&config).unwrap();
        assert_eq!(
            captioner.endpoint,
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(captioner.max_tokens, 500);
    }
}
