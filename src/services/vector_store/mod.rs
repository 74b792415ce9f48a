//! Vector store abstraction layer.
//!
//! A trait-based abstraction over vector store backends (Qdrant,
//! PostgreSQL/pgvector). The pipeline and query path only ever see the
//! trait; the backend is chosen by configuration.

mod pgvector;
mod qdrant;

pub use pgvector::PgVectorBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{MemeMetadata, ScoredMeme, VectorDriver, VectorStoreConfig};

/// Abstract interface over the external vector index.
///
/// The store holds complete records only: a vector and its metadata are
/// always written in the same upsert call.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Create the collection if absent; no-op if present with a matching
    /// dimension. An existing collection with a different dimension is a
    /// `DimensionMismatch`.
    async fn ensure_index(&self) -> Result<(), VectorStoreError>;

    /// Write embeddings and metadata as one call. `embeddings` and `memes`
    /// must have the same length; a partial failure counts as a failure of
    /// the whole call and the caller retries the full batch.
    async fn upsert(
        &self,
        embeddings: Vec<Vec<f32>>,
        memes: Vec<MemeMetadata>,
    ) -> Result<u64, VectorStoreError>;

    /// K-nearest-neighbor query, highest similarity first, at most `limit`
    /// results, optionally filtered to scores >= `min_score`.
    async fn query(
        &self,
        vector: Vec<f32>,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredMeme>, VectorStoreError>;

    /// Number of stored records, or None if the collection doesn't exist.
    async fn count(&self) -> Result<Option<u64>, VectorStoreError>;

    /// Collection/table name.
    fn collection(&self) -> &str;
}

/// Reject mismatched batches before anything reaches the store.
pub(crate) fn check_arity(
    embeddings: &[Vec<f32>],
    memes: &[MemeMetadata],
) -> Result<(), VectorStoreError> {
    if embeddings.len() != memes.len() {
        return Err(VectorStoreError::ArityMismatch {
            vectors: embeddings.len(),
            metadata: memes.len(),
        });
    }
    Ok(())
}

/// Reject query vectors of the wrong dimensionality.
pub(crate) fn check_query_dimension(
    vector: &[f32],
    expected: u64,
) -> Result<(), VectorStoreError> {
    if vector.len() as u64 != expected {
        return Err(VectorStoreError::QueryError(format!(
            "query vector has dimension {}, index expects {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

/// Create a vector store backend based on configuration.
pub async fn create_backend(
    config: &VectorStoreConfig,
    embedding_dim: u64,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => {
            let backend = QdrantBackend::new(config, embedding_dim)?;
            Ok(Box::new(backend))
        }
        VectorDriver::PostgreSQL => {
            let backend = PgVectorBackend::new(config, embedding_dim).await?;
            Ok(Box::new(backend))
        }
    }
}
