pub mod embedding;
pub mod enricher;
pub mod pipeline;
pub mod query;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod mocks;

pub use embedding::{EmbeddingProvider, OpenAiEmbedder};
pub use enricher::{Enricher, OpenAiCaptioner};
pub use pipeline::{IndexingPipeline, Stage};
pub use query::QueryService;
pub use vector_store::{VectorStore, create_backend};
