//! Domain types for memes as they move through the pipeline.
//!
//! One acquisition page produces a batch of [`RawMeme`] stubs, each of which
//! is enriched with a generated description, embedded, and finally persisted
//! as metadata + vector under the configured collection.

use serde::{Deserialize, Serialize};
use url::Url;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A meme stub as extracted from the remote listing. Transient; never
/// persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawMeme {
    /// Link to the meme's entry page
    pub url: String,

    /// Link to the meme image itself
    #[serde(rename = "imageUrl")]
    pub image_url: String,

    /// Listing title
    pub title: String,
}

impl RawMeme {
    pub fn new(
        url: impl Into<String>,
        image_url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            image_url: image_url.into(),
            title: title.into(),
        }
    }

    /// Stubs with a missing or malformed url/image or a blank title are
    /// dropped before they enter the pipeline.
    pub fn is_valid(&self) -> bool {
        is_http_url(&self.url) && is_http_url(&self.image_url) && !self.title.trim().is_empty()
    }
}

fn is_http_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// A meme with its model-generated description. The description is empty
/// when enrichment failed for this item; it is never absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedMeme {
    #[serde(flatten)]
    pub meme: RawMeme,

    pub description: String,
}

impl EnrichedMeme {
    pub fn new(meme: RawMeme, description: String) -> Self {
        Self { meme, description }
    }

    /// Text fed to the embedding provider: title and description joined by
    /// a single space. An empty description leaves just the title.
    pub fn embedding_text(&self) -> String {
        let mut text = self.meme.title.clone();
        if !self.description.is_empty() {
            text.push(' ');
            text.push_str(&self.description);
        }
        text
    }
}

/// An enriched meme plus its embedding vector, ready for storage.
#[derive(Debug, Clone)]
pub struct EmbeddedMeme {
    pub meme: EnrichedMeme,
    pub embedding: Vec<f32>,
}

impl EmbeddedMeme {
    pub fn into_parts(self) -> (Vec<f32>, MemeMetadata) {
        let metadata = MemeMetadata {
            url: self.meme.meme.url,
            image_url: self.meme.meme.image_url,
            title: self.meme.meme.title,
            ai_description: self.meme.description,
        };
        (self.embedding, metadata)
    }
}

/// The metadata half of a stored record. These four fields are written in
/// the same upsert call as the embedding; the store never holds one without
/// the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemeMetadata {
    pub url: String,

    #[serde(rename = "imageUrl")]
    pub image_url: String,

    pub title: String,

    #[serde(rename = "aiDescription", default)]
    pub ai_description: String,
}

/// One ranked hit from the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMeme {
    pub meme: MemeMetadata,
    pub score: f32,
}

/// Search response shape: parallel arrays, descending score order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub memes: Vec<MemeMetadata>,
    pub scores: Vec<f32>,
}

impl SearchResponse {
    pub fn from_hits(hits: Vec<ScoredMeme>) -> Self {
        let mut memes = Vec::with_capacity(hits.len());
        let mut scores = Vec::with_capacity(hits.len());
        for hit in hits {
            memes.push(hit.meme);
            scores.push(hit.score);
        }
        Self { memes, scores }
    }

    pub fn is_empty(&self) -> bool {
        self.memes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_meme_validation() {
        let ok = RawMeme::new(
            "https://knowyourmeme.com/memes/drake-hotline-bling",
            "https://i.kym-cdn.com/entries/icons/original/000/019/277/drake.jpg",
            "Drake Hotline Bling",
        );
        assert!(ok.is_valid());

        let missing_image = RawMeme::new("https://example.com/a", "", "A");
        assert!(!missing_image.is_valid());

        let relative_url = RawMeme::new("/memes/a", "https://example.com/a.jpg", "A");
        assert!(!relative_url.is_valid());

        let blank_title = RawMeme::new(
            "https://example.com/a",
            "https://example.com/a.jpg",
            "   ",
        );
        assert!(!blank_title.is_valid());

        let bad_scheme = RawMeme::new(
            "ftp://example.com/a",
            "https://example.com/a.jpg",
            "A",
        );
        assert!(!bad_scheme.is_valid());
    }

    #[test]
    fn test_embedding_text_joins_title_and_description() {
        let meme = RawMeme::new("https://e.com/a", "https://e.com/a.jpg", "Drake");
        let enriched = EnrichedMeme::new(meme.clone(), "A two-panel reaction meme".to_string());
        assert_eq!(enriched.embedding_text(), "Drake A two-panel reaction meme");

        let degraded = EnrichedMeme::new(meme, String::new());
        assert_eq!(degraded.embedding_text(), "Drake");
    }

    #[test]
    fn test_metadata_wire_shape() {
        let metadata = MemeMetadata {
            url: "https://e.com/a".to_string(),
            image_url: "https://e.com/a.jpg".to_string(),
            title: "Drake".to_string(),
            ai_description: "desc".to_string(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["imageUrl"], "https://e.com/a.jpg");
        assert_eq!(json["aiDescription"], "desc");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_search_response_from_hits() {
        let hit = ScoredMeme {
            meme: MemeMetadata {
                url: "https://e.com/a".to_string(),
                image_url: "https://e.com/a.jpg".to_string(),
                title: "Drake".to_string(),
                ai_description: String::new(),
            },
            score: 0.81,
        };
        let response = SearchResponse::from_hits(vec![hit]);
        assert_eq!(response.memes.len(), 1);
        assert_eq!(response.scores, vec![0.81]);
    }
}
