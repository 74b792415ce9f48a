//! Direct render strategy: fetch the listing page for a page number and
//! extract the item grid with structural CSS selectors.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

use super::{ContentAcquirer, filter_and_cap};
use crate::error::AcquisitionError;
use crate::models::{AcquisitionConfig, RawMeme};

const USER_AGENT: &str = "memedex/0.2 (+https://github.com/memedex/memedex)";

pub struct ListingAcquirer {
    client: Client,
    listing_url: String,
    page_size: usize,
    entry_selector: Selector,
    link_selector: Selector,
    image_selector: Selector,
    title_selector: Selector,
}

impl ListingAcquirer {
    pub fn new(config: &AcquisitionConfig) -> Result<Self, AcquisitionError> {
        if config.listing_url.trim().is_empty() {
            return Err(AcquisitionError::InvalidConfig(
                "listing_url is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AcquisitionError::InvalidConfig(e.to_string()))?;

        // Selectors are static strings; parse failures here are programmer
        // errors, but surfaced as config errors rather than panics
        let parse = |s: &str| {
            Selector::parse(s)
                .map_err(|e| AcquisitionError::InvalidConfig(format!("bad selector {}: {}", s, e)))
        };

        Ok(Self {
            client,
            listing_url: config.listing_url.trim_end_matches('/').to_string(),
            page_size: config.page_size as usize,
            entry_selector: parse(".entry-grid-body .entry")?,
            link_selector: parse("a")?,
            image_selector: parse("img")?,
            title_selector: parse("h2")?,
        })
    }

    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.listing_url.clone()
        } else {
            format!("{}/page/{}", self.listing_url, page)
        }
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<RawMeme>, AcquisitionError> {
        let url = self.page_url(page);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AcquisitionError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AcquisitionError::RequestError(format!(
                "listing fetch returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AcquisitionError::RequestError(e.to_string()))?;

        Ok(self.extract_entries(&body))
    }

    fn extract_entries(&self, html: &str) -> Vec<RawMeme> {
        let document = Html::parse_document(html);
        let mut stubs = Vec::new();

        for entry in document.select(&self.entry_selector) {
            let url = entry
                .select(&self.link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| absolutize(&self.listing_url, href))
                .unwrap_or_default();

            // Lazy-loaded grids put the real image in data-src
            let image_url = entry
                .select(&self.image_selector)
                .next()
                .and_then(|img| {
                    img.value()
                        .attr("data-src")
                        .or_else(|| img.value().attr("src"))
                })
                .unwrap_or_default()
                .to_string();

            let title = entry
                .select(&self.title_selector)
                .next()
                .map(|h2| h2.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            stubs.push(RawMeme::new(url, image_url, title));
        }

        stubs
    }
}

/// Listing hrefs are usually site-relative; resolve them against the
/// listing origin.
fn absolutize(listing_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match url::Url::parse(listing_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

#[async_trait]
impl ContentAcquirer for ListingAcquirer {
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
        "listing"
    }
}
