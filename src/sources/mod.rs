//! Content acquisition strategies.
//!
//! An acquirer turns a page number into a bounded batch of raw meme stubs.
//! Transient failures (network, timeouts, malformed responses, extraction
//! misses) degrade the page to an empty batch inside the acquirer; only
//! configuration problems surface as hard errors, because those would fail
//! every page of a run identically.

mod crawl;
mod listing;

pub use crawl::CrawlAcquirer;
pub use listing::ListingAcquirer;

use async_trait::async_trait;

use crate::error::AcquisitionError;
use crate::models::{AcquisitionBackend, Config, RawMeme};

/// Capability interface for acquiring one page of raw meme stubs.
#[async_trait]
pub trait ContentAcquirer: Send + Sync {
    /// Retrieve up to the configured batch size of valid stubs for the
    /// page. An empty vec is a valid, unproductive outcome.
    async fn acquire(&self, page: u32) -> Result<Vec<RawMeme>, AcquisitionError>;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Drop invalid stubs and cap the batch to the first `limit` valid items.
pub(crate) fn filter_and_cap(stubs: Vec<RawMeme>, limit: usize) -> Vec<RawMeme> {
    stubs
        .into_iter()
        .filter(RawMeme::is_valid)
        .take(limit)
        .collect()
}

/// Create the configured acquisition backend.
pub fn create_acquirer(config: &Config) -> Result<Box<dyn ContentAcquirer>, AcquisitionError> {
    match config.acquisition.backend {
        AcquisitionBackend::Listing => {
            let acquirer = ListingAcquirer::new(&config.acquisition)?;
            Ok(Box::new(acquirer))
        }
        AcquisitionBackend::Crawl => {
            let acquirer = CrawlAcquirer::new(&config.acquisition, &config.openai)?;
            Ok(Box::new(acquirer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(url: &str, image: &str, title: &str) -> RawMeme {
        RawMeme::new(url, image, title)
    }

    #[test]
    fn test_filter_and_cap_drops_invalid() {
        let stubs = vec![
            stub("https://e.com/a", "https://e.com/a.jpg", "A"),
            stub("https://e.com/b", "", "B"),
            stub("", "https://e.com/c.jpg", "C"),
            stub("https://e.com/d", "https://e.com/d.jpg", "D"),
        ];
        let kept = filter_and_cap(stubs, 16);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "A");
        assert_eq!(kept[1].title, "D");
    }

    #[test]
    fn test_filter_and_cap_applies_limit() {
        let stubs: Vec<RawMeme> = (0..20)
            .map(|i| {
                stub(
                    &format!("https://e.com/{}", i),
                    &format!("https://e.com/{}.jpg", i),
                    &format!("Meme {}", i),
                )
            })
            .collect();
        let kept = filter_and_cap(stubs, 5);
        assert_eq!(kept.len(), 5);
        assert_eq!(kept[4].title, "Meme 4");
    }
}
