pub mod config;
pub mod meme;
pub mod report;

pub use config::{
    AcquisitionConfig, AcquisitionBackend, Config, IndexingConfig, OpenAiConfig, SearchConfig,
    VectorDriver, VectorStoreConfig,
};
pub use meme::{EmbeddedMeme, EnrichedMeme, MemeMetadata, OutputFormat, RawMeme, ScoredMeme, SearchResponse};
pub use report::{PageFailure, PageReport, RangeReport};
