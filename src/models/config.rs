use serde::{Deserialize, Serialize};

pub const DEFAULT_LISTING_URL: &str = "https://knowyourmeme.com/memes/popular";
pub const DEFAULT_CRAWL_URL: &str = "https://api.firecrawl.dev";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "memes";

/// text-embedding-3-small output dimensionality. Fixed for the lifetime of
/// the index.
pub const DEFAULT_EMBEDDING_DIM: u32 = 1536;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("memedex").join("config.toml"))
    }

    pub fn load() -> Result<Self, crate::error::ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, crate::error::ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), crate::error::ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Which acquisition strategy drives a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionBackend {
    /// Fetch the listing page directly and extract the item grid
    #[default]
    Listing,
    /// Submit an asynchronous crawl job and poll it to completion
    Crawl,
}

impl std::str::FromStr for AcquisitionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "listing" => Ok(AcquisitionBackend::Listing),
            "crawl" => Ok(AcquisitionBackend::Crawl),
            _ => Err(format!("unknown acquisition backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default)]
    pub backend: AcquisitionBackend,

    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_crawl_url")]
    pub crawl_url: String,

    /// Crawl API key; falls back to FIRECRAWL_API_KEY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_api_key: Option<String>,

    /// First N valid stubs kept per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound on total crawl-poll duration for one page
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_listing_url() -> String {
    DEFAULT_LISTING_URL.to_string()
}

fn default_crawl_url() -> String {
    DEFAULT_CRAWL_URL.to_string()
}

fn default_page_size() -> u32 {
    16
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_timeout() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            backend: AcquisitionBackend::default(),
            listing_url: default_listing_url(),
            crawl_url: default_crawl_url(),
            crawl_api_key: None,
            page_size: default_page_size(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl AcquisitionConfig {
    pub fn resolved_crawl_api_key(&self) -> Option<String> {
        self.crawl_api_key
            .clone()
            .or_else(|| std::env::var("FIRECRAWL_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    /// API key; falls back to OPENAI_API_KEY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_caption_model")]
    pub caption_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_caption_tokens")]
    pub max_caption_tokens: u32,

    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

fn default_openai_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_caption_model() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIM
}

fn default_max_caption_tokens() -> u32 {
    500
}

fn default_openai_timeout() -> u64 {
    60
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_url(),
            api_key: None,
            caption_model: default_caption_model(),
            embedding_model: default_embedding_model(),
            dimension: default_dimension(),
            max_caption_tokens: default_max_caption_tokens(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

impl OpenAiConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Qdrant,
    #[serde(rename = "postgres")]
    PostgreSQL,
}

impl std::str::FromStr for VectorDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(VectorDriver::Qdrant),
            "postgres" | "postgresql" | "pgvector" => Ok(VectorDriver::PostgreSQL),
            _ => Err(format!("unknown vector driver: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Qdrant => write!(f, "qdrant"),
            VectorDriver::PostgreSQL => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Qdrant API key; falls back to QDRANT_API_KEY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_pool_max")]
    pub pool_max: u32,
}

fn default_store_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_pool_max() -> u32 {
    5
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_store_url(),
            collection: default_collection(),
            api_key: None,
            pool_max: default_pool_max(),
        }
    }
}

impl VectorStoreConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("QDRANT_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Pause between pages in a range run
    #[serde(default = "default_page_delay")]
    pub page_delay_secs: u64,

    /// Hard cap on pages per invocation
    #[serde(default = "default_max_pages")]
    pub max_pages_per_run: u32,
}

fn default_page_delay() -> u64 {
    2
}

fn default_max_pages() -> u32 {
    50
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            page_delay_secs: default_page_delay(),
            max_pages_per_run: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: u32,

    /// Similarity threshold for the full-search path; suggestions are
    /// unthresholded.
    #[serde(default = "default_min_score")]
    pub min_score: Option<f32>,

    #[serde(default)]
    pub default_format: crate::models::OutputFormat,
}

fn default_limit() -> u32 {
    10
}

fn default_suggestion_limit() -> u32 {
    5
}

fn default_min_score() -> Option<f32> {
    Some(0.5)
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            suggestion_limit: default_suggestion_limit(),
            min_score: default_min_score(),
            default_format: crate::models::OutputFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.acquisition.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(config.openai.dimension, 1536);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.indexing.page_delay_secs, 2);
        assert_eq!(config.indexing.max_pages_per_run, 50);
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.search.suggestion_limit, 5);
        assert_eq!(config.search.min_score, Some(0.5));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(
            "listing".parse::<AcquisitionBackend>().unwrap(),
            AcquisitionBackend::Listing
        );
        assert_eq!(
            "crawl".parse::<AcquisitionBackend>().unwrap(),
            AcquisitionBackend::Crawl
        );
        assert!("browser".parse::<AcquisitionBackend>().is_err());
    }

    #[test]
    fn test_driver_parse() {
        assert_eq!("qdrant".parse::<VectorDriver>().unwrap(), VectorDriver::Qdrant);
        assert_eq!(
            "pgvector".parse::<VectorDriver>().unwrap(),
            VectorDriver::PostgreSQL
        );
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.search.limit = 25;
        config.vector_store.driver = VectorDriver::PostgreSQL;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.search.limit, 25);
        assert_eq!(loaded.vector_store.driver, VectorDriver::PostgreSQL);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [search]
            limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.search.limit, 3);
        assert_eq!(config.search.suggestion_limit, 5);
        assert_eq!(config.acquisition.page_size, 16);
    }
}
