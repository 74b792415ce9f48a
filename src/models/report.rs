//! Structured outcomes of indexing runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::meme::MemeMetadata;

/// Per-stage counts and stored metadata for one completed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub page: u32,

    #[serde(rename = "runId")]
    pub run_id: Uuid,

    pub acquired: u64,
    pub enriched: u64,
    pub embedded: u64,
    pub stored: u64,

    /// Metadata of the records written for this page
    pub memes: Vec<MemeMetadata>,
}

impl PageReport {
    /// A page whose acquisition came back empty: valid, just unproductive.
    pub fn empty(page: u32, run_id: Uuid) -> Self {
        Self {
            page,
            run_id,
            acquired: 0,
            enriched: 0,
            embedded: 0,
            stored: 0,
            memes: Vec::new(),
        }
    }
}

/// A page that hit a hard failure at the page boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFailure {
    pub page: u32,
    pub error: String,
}

/// Aggregate outcome of a multi-page run. One page failing never aborts
/// the range; it lands in `failed` and the run moves on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeReport {
    #[serde(rename = "startPage")]
    pub start_page: u32,

    #[serde(rename = "endPage")]
    pub end_page: u32,

    pub results: Vec<PageReport>,
    pub errors: Vec<PageFailure>,
}

impl RangeReport {
    pub fn new(start_page: u32, end_page: u32) -> Self {
        Self {
            start_page,
            end_page,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn completed_pages(&self) -> u64 {
        self.results.len() as u64
    }

    pub fn failed_pages(&self) -> u64 {
        self.errors.len() as u64
    }

    pub fn total_stored(&self) -> u64 {
        self.results.iter().map(|r| r.stored).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_report() {
        let report = PageReport::empty(3, Uuid::new_v4());
        assert_eq!(report.page, 3);
        assert_eq!(report.acquired, 0);
        assert_eq!(report.stored, 0);
        assert!(report.memes.is_empty());
    }

    #[test]
    fn test_range_report_counts() {
        let mut report = RangeReport::new(1, 3);
        report.results.push(PageReport::empty(1, Uuid::new_v4()));
        report.errors.push(PageFailure {
            page: 2,
            error: "upsert error: connection reset".to_string(),
        });
        assert_eq!(report.completed_pages(), 1);
        assert_eq!(report.failed_pages(), 1);
    }

    #[test]
    fn test_report_wire_shape() {
        let report = PageReport::empty(1, Uuid::nil());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("runId").is_some());
        assert!(json.get("run_id").is_none());

        let range = RangeReport::new(1, 2);
        let json = serde_json::to_value(&range).unwrap();
        assert!(json.get("startPage").is_some());
        assert!(json.get("endPage").is_some());
    }
}
