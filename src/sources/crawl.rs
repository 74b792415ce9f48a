//! Crawl/poll strategy: submit an asynchronous crawl job for the page URL,
//! poll it on a fixed interval, then pull structured items out of the
//! rendered text with a schema-constrained extraction call.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use super::{ContentAcquirer, filter_and_cap};
use crate::error::AcquisitionError;
use crate::models::{AcquisitionConfig, OpenAiConfig, RawMeme};

#[derive(Debug, Deserialize)]
struct CrawlSubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CrawlStatusResponse {
    status: String,
    #[serde(default)]
    data: Vec<CrawlDocument>,
}

#[derive(Debug, Deserialize)]
struct CrawlDocument {
    #[serde(default)]
    markdown: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractedItems {
    #[serde(default)]
    memes: Vec<RawMeme>,
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

pub struct CrawlAcquirer {
    client: Client,
    crawl_url: String,
    crawl_api_key: String,
    listing_url: String,
    extraction_endpoint: String,
    extraction_model: String,
    openai_api_key: String,
    page_size: usize,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl CrawlAcquirer {
    pub fn new(
        config: &AcquisitionConfig,
        openai: &OpenAiConfig,
    ) -> Result<Self, AcquisitionError> {
        let crawl_api_key = config.resolved_crawl_api_key().ok_or_else(|| {
            AcquisitionError::MissingCredentials("FIRECRAWL_API_KEY".to_string())
        })?;
        let openai_api_key = openai
            .resolved_api_key()
            .ok_or_else(|| AcquisitionError::MissingCredentials("OPENAI_API_KEY".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(openai.timeout_secs)))
            .build()
            .map_err(|e| AcquisitionError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            crawl_url: config.crawl_url.trim_end_matches('/').to_string(),
            crawl_api_key,
            listing_url: config.listing_url.trim_end_matches('/').to_string(),
            extraction_endpoint: format!(
                "{}/chat/completions",
                openai.base_url.trim_end_matches('/')
            ),
            extraction_model: openai.caption_model.clone(),
            openai_api_key,
            page_size: config.page_size as usize,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        })
    }

    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.listing_url.clone()
        } else {
            format!("{}/page/{}", self.listing_url, page)
        }
    }

    fn crawl_headers(&self) -> Result<HeaderMap, AcquisitionError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.crawl_api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| AcquisitionError::InvalidConfig(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn submit_job(&self, page: u32) -> Result<String, AcquisitionError> {
        let body = json!({
            "url": self.page_url(page),
            "limit": 1,
            "scrapeOptions": { "formats": ["markdown"] },
        });

        let response = self
            .client
            .post(format!("{}/v1/crawl", self.crawl_url))
            .headers(self.crawl_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| AcquisitionError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AcquisitionError::CrawlJobError(format!(
                "submit returned {}: {}",
                status, text
            )));
        }

        let submitted: CrawlSubmitResponse = response
            .json()
            .await
            .map_err(|e| AcquisitionError::CrawlJobError(e.to_string()))?;

        Ok(submitted.id)
    }

    /// Poll the job on a fixed interval until it leaves the in-progress
    /// state, bounded by the configured total timeout. The original system
    /// polled unboundedly; the explicit bound turns a stuck job into an
    /// empty page instead of a wedged run.
    async fn poll_job(&self, job_id: &str) -> Result<String, AcquisitionError> {
        let deadline = Instant::now() + self.poll_timeout;

        loop {
            let response = self
                .client
                .get(format!("{}/v1/crawl/{}", self.crawl_url, job_id))
                .headers(self.crawl_headers()?)
                .send()
                .await
                .map_err(|e| AcquisitionError::RequestError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AcquisitionError::CrawlJobError(format!(
                    "status poll returned {}",
                    response.status()
                )));
            }

            let status: CrawlStatusResponse = response
                .json()
                .await
                .map_err(|e| AcquisitionError::CrawlJobError(e.to_string()))?;

            match status.status.as_str() {
                "completed" => {
                    let markdown = status
                        .data
                        .into_iter()
                        .next()
                        .and_then(|doc| doc.markdown)
                        .unwrap_or_default();
                    if markdown.is_empty() {
                        return Err(AcquisitionError::CrawlJobError(
                            "completed job carried no document".to_string(),
                        ));
                    }
                    return Ok(markdown);
                }
                "scraping" | "in progress" | "waiting" => {
                    if Instant::now() + self.poll_interval > deadline {
                        return Err(AcquisitionError::PollTimeout(
                            self.poll_timeout.as_secs(),
                        ));
                    }
                    sleep(self.poll_interval).await;
                }
                other => {
                    return Err(AcquisitionError::CrawlJobError(format!(
                        "job ended with status {}",
                        other
                    )));
                }
            }
        }
    }

    /// Schema-constrained extraction of meme stubs from the rendered page
    /// text.
    async fn extract_items(&self, markdown: &str) -> Result<Vec<RawMeme>, AcquisitionError> {
        let prompt = format!(
            "Extract meme entries from this listing page. Respond with a JSON object \
             of the shape {{\"memes\": [{{\"url\": string, \"imageUrl\": string, \
             \"title\": string}}]}} using absolute URLs. Page content:\n\n{}",
            markdown
        );

        let body = json!({
            "model": self.extraction_model,
            "response_format": { "type": "json_object" },
            "messages": [{ "role": "user", "content": prompt }],
        });

        let auth = format!("Bearer {}", self.openai_api_key.trim());
        let response = self
            .client
            .post(&self.extraction_endpoint)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AcquisitionError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AcquisitionError::ExtractionError(format!(
                "extraction call returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AcquisitionError::ExtractionError(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| {
                AcquisitionError::ExtractionError("extraction returned no content".to_string())
            })?;

        let items: ExtractedItems = serde_json::from_str(&content).map_err(|e| {
            AcquisitionError::ExtractionError(format!("no valid JSON in extraction: {}", e))
        })?;

        Ok(items.memes)
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<RawMeme>, AcquisitionError> {
        let job_id = self.submit_job(page).await?;
        let markdown = self.poll_job(&job_id).await?;
        self.extract_items(&markdown).await
    }
}

#[async_trait]
impl ContentAcquirer for CrawlAcquirer {
    async fn acquire(&self, page: u32) -> Result<Vec<RawMeme>, AcquisitionError> {
        match self.fetch_page(page).await {
            Ok(stubs) => Ok(filter_and_cap(stubs, self.page_size)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                eprintln!("Warning: page {}: acquisition failed: {}", page, e);
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &str {
        "crawl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_crawl_key_is_fatal() {
        if std::env::var("FIRECRAWL_API_KEY").is_ok() {
            return;
        }
        let config = AcquisitionConfig::default();
        let openai = OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            CrawlAcquirer::new(&config, &openai),
            Err(AcquisitionError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_extraction_payload_parses() {
        let content = r#"{"memes": [{"url": "https://e.com/a", "imageUrl": "https://e.com/a.jpg", "title": "A"}]}"#;
        let items: ExtractedItems = serde_json::from_str(content).unwrap();
        assert_eq!(items.memes.len(), 1);
        assert_eq!(items.memes[0].image_url, "https://e.com/a.jpg");
    }
}
