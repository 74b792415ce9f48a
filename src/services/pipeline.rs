//! The indexing pipeline: acquire -> enrich -> embed -> store, one page at
//! a time.
//!
//! Each page runs through an explicit sequence of stages with an explicit
//! batch value passed between them. Failure isolation is layered: a single
//! item failing enrichment degrades that item, a single item failing
//! embedding drops that item, and only acquisition/storage errors fail the
//! page. A failed page never aborts a multi-page range.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::error::{EmbeddingError, PipelineError};
use crate::models::{
    EmbeddedMeme, EnrichedMeme, PageFailure, PageReport, RangeReport, RawMeme,
};
use crate::services::embedding::EmbeddingProvider;
use crate::services::enricher::Enricher;
use crate::services::vector_store::VectorStore;
use crate::sources::ContentAcquirer;

/// Pipeline stages for one page. `Failed` is reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquiring,
    Enriching,
    Embedding,
    Storing,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Acquiring => "acquiring",
            Stage::Enriching => "enriching",
            Stage::Embedding => "embedding",
            Stage::Storing => "storing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Orchestrates the four capability interfaces over one page or a page
/// range. Holds no mutable state of its own; every run owns its batch.
pub struct IndexingPipeline {
    acquirer: Arc<dyn ContentAcquirer>,
    enricher: Arc<dyn Enricher>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    page_delay: Duration,
    verbose: bool,
}

impl IndexingPipeline {
    pub fn new(
        acquirer: Arc<dyn ContentAcquirer>,
        enricher: Arc<dyn Enricher>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        page_delay: Duration,
    ) -> Self {
        Self {
            acquirer,
            enricher,
            embedder,
            store,
            page_delay,
            verbose: false,
        }
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn trace(&self, page: u32, stage: Stage) {
        if self.verbose {
            eprintln!("page {}: {}", page, stage);
        }
    }

    /// Run the full state machine over one page.
    ///
    /// An empty acquisition is a successful run with zero counts. Hard
    /// acquisition errors, embedding-dimension violations, and storage
    /// errors fail the page; the caller retries by re-running the same
    /// page, there is no partial credit.
    pub async fn run_page(&self, page: u32) -> Result<PageReport, PipelineError> {
        let run_id = Uuid::new_v4();

        self.trace(page, Stage::Acquiring);
        let raw = self.acquirer.acquire(page).await?;
        let acquired = raw.len() as u64;
        if raw.is_empty() {
            if self.verbose {
                eprintln!("page {}: nothing acquired", page);
            }
            self.trace(page, Stage::Done);
            return Ok(PageReport::empty(page, run_id));
        }

        // Enriching is sequential to respect provider rate limits; a failed
        // caption degrades to an empty description and the item stays in
        self.trace(page, Stage::Enriching);
        let enriched = self.enrich_batch(page, raw).await;
        let enriched_ok = enriched
            .iter()
            .filter(|m| !m.description.is_empty())
            .count() as u64;

        // A provider failure drops the item, since a record without a
        // vector is unrepresentable in the store
        self.trace(page, Stage::Embedding);
        let embedded = self.embed_batch(page, enriched).await?;
        let embedded_count = embedded.len() as u64;

        // Idempotent index check, then exactly one upsert carrying every
        // surviving item
        let mut stored = 0;
        let mut memes = Vec::new();
        if !embedded.is_empty() {
            self.trace(page, Stage::Storing);
            self.store.ensure_index().await?;

            let mut embeddings = Vec::with_capacity(embedded.len());
            for item in embedded {
                let (embedding, metadata) = item.into_parts();
                embeddings.push(embedding);
                memes.push(metadata);
            }

            stored = self.store.upsert(embeddings, memes.clone()).await?;
        }

        self.trace(page, Stage::Done);
        Ok(PageReport {
            page,
            run_id,
            acquired,
            enriched: enriched_ok,
            embedded: embedded_count,
            stored,
            memes,
        })
    }

    async fn enrich_batch(&self, page: u32, raw: Vec<RawMeme>) -> Vec<EnrichedMeme> {
        let mut enriched = Vec::with_capacity(raw.len());

        for meme in raw {
            let description = match self.enricher.describe(&meme).await {
                Ok(caption) => caption,
                Err(e) => {
                    eprintln!(
                        "Warning: page {}: enrichment failed for \"{}\": {}",
                        page, meme.title, e
                    );
                    String::new()
                }
            };
            enriched.push(EnrichedMeme::new(meme, description));
        }

        enriched
    }

    async fn embed_batch(
        &self,
        page: u32,
        enriched: Vec<EnrichedMeme>,
    ) -> Result<Vec<EmbeddedMeme>, PipelineError> {
        let expected_dim = self.embedder.dimension();
        let mut embedded = Vec::with_capacity(enriched.len());

        for meme in enriched {
            let text = meme.embedding_text();
            match self.embedder.embed(&text).await {
                Ok(embedding) => {
                    // A wrong-length vector means the provider and the index
                    // disagree about dimensionality; that fails the page
                    if embedding.len() as u64 != expected_dim {
                        return Err(PipelineError::Embedding(EmbeddingError::InvalidResponse(
                            format!(
                                "provider returned dimension {}, expected {}",
                                embedding.len(),
                                expected_dim
                            ),
                        )));
                    }
                    embedded.push(EmbeddedMeme { meme, embedding });
                }
                Err(e) => {
                    eprintln!(
                        "Warning: page {}: dropping \"{}\", embedding failed: {}",
                        page, meme.meme.title, e
                    );
                }
            }
        }

        Ok(embedded)
    }

    /// Drive the page state machine over a contiguous range, sequentially,
    /// with a fixed inter-page delay. One page failing is recorded and the
    /// run moves on. The stop flag is honored between pages; an in-flight
    /// page always runs to completion.
    pub async fn run_range(
        &self,
        start_page: u32,
        end_page: u32,
        stop: Arc<AtomicBool>,
    ) -> RangeReport {
        let mut report = RangeReport::new(start_page, end_page);

        for page in start_page..=end_page {
            if stop.load(Ordering::Relaxed) {
                eprintln!("Stop requested; not submitting page {}", page);
                break;
            }

            if self.verbose {
                eprintln!("Starting page {} of {}..{}", page, start_page, end_page);
            }

            match self.run_page(page).await {
                Ok(page_report) => {
                    if self.verbose {
                        eprintln!(
                            "page {}: acquired {}, stored {}",
                            page, page_report.acquired, page_report.stored
                        );
                    }
                    report.results.push(page_report);
                }
                Err(e) => {
                    self.trace(page, Stage::Failed);
                    eprintln!("Warning: page {} failed: {}", page, e);
                    report.errors.push(PageFailure {
                        page,
                        error: e.to_string(),
                    });
                }
            }

            if page < end_page && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        report
    }
}
