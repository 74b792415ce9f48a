//! Error types for the meme indexing and search pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors raised while acquiring raw meme stubs from the remote source.
///
/// Only configuration problems are fatal to a run; transient acquisition
/// failures (network, timeout, malformed responses) are absorbed by the
/// acquirer itself and reported as an empty batch.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid acquisition config: {0}")]
    InvalidConfig(String),

    #[error("acquisition request failed: {0}")]
    RequestError(String),

    #[error("crawl job failed: {0}")]
    CrawlJobError(String),

    #[error("crawl job timed out after {0}s")]
    PollTimeout(u64),

    #[error("extraction produced no valid items: {0}")]
    ExtractionError(String),
}

impl AcquisitionError {
    /// Fatal errors abort the whole run; everything else degrades the
    /// current page to an empty batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AcquisitionError::MissingCredentials(_) | AcquisitionError::InvalidConfig(_)
        )
    }
}

/// Errors raised by the vision captioning call for a single meme.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("caption request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("caption provider error: {0}")]
    ProviderError(String),

    #[error("invalid caption response: {0}")]
    InvalidResponse(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("missing OpenAI API key")]
    MissingApiKey,

    #[error("failed to build embedding client: {0}")]
    ConnectionError(String),

    #[error("embedding provider error: {0}")]
    ProviderError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // Provider errors might be transient (429/5xx)
            EmbeddingError::ProviderError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::MissingApiKey | EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("index error: {0}")]
    IndexError(String),

    #[error("index dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: u64, found: u64 },

    #[error("arity mismatch: {vectors} vectors for {metadata} metadata entries")]
    ArityMismatch { vectors: usize, metadata: usize },

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("postgres error: {0}")]
    PostgresError(String),

    #[error("pgvector extension error: {0}")]
    PgVectorExtensionError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::DimensionMismatch { .. }
            | VectorStoreError::ArityMismatch { .. }
            | VectorStoreError::PgVectorExtensionError(_) => false,
            VectorStoreError::IndexError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::QueryError(msg)
            | VectorStoreError::PostgresError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Page-level pipeline failures. Anything below the page boundary is
/// recovered inside the pipeline and never becomes a `PipelineError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors related to search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_fatality() {
        assert!(AcquisitionError::MissingCredentials("FIRECRAWL_API_KEY".into()).is_fatal());
        assert!(AcquisitionError::InvalidConfig("bad listing url".into()).is_fatal());
        assert!(!AcquisitionError::RequestError("connection reset".into()).is_fatal());
        assert!(!AcquisitionError::PollTimeout(300).is_fatal());
        assert!(!AcquisitionError::ExtractionError("no valid JSON".into()).is_fatal());
    }

    #[test]
    fn test_embedding_retryability() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::ProviderError("status 429: slow down".into()).is_retryable());
        assert!(!EmbeddingError::InvalidResponse("truncated body".into()).is_retryable());
        assert!(!EmbeddingError::MissingApiKey.is_retryable());
    }

    #[test]
    fn test_store_mismatches_not_retryable() {
        let dim = VectorStoreError::DimensionMismatch {
            expected: 1536,
            found: 1024,
        };
        let arity = VectorStoreError::ArityMismatch {
            vectors: 3,
            metadata: 2,
        };
        assert!(!dim.is_retryable());
        assert!(!arity.is_retryable());
    }
}
