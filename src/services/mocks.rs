//! Test doubles for the four capability interfaces the pipeline and query
//! path are built on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AcquisitionError, EmbeddingError, EnrichmentError, VectorStoreError};
use crate::models::{MemeMetadata, RawMeme, ScoredMeme};
use crate::services::embedding::EmbeddingProvider;
use crate::services::enricher::Enricher;
use crate::services::vector_store::{VectorStore, check_arity};
use crate::sources::{ContentAcquirer, filter_and_cap};

pub fn stub(n: usize) -> RawMeme {
    RawMeme::new(
        format!("https://e.com/{n}"),
        format!("https://e.com/{n}.jpg"),
        format!("Meme {n}"),
    )
}

pub fn hit(title: &str, score: f32) -> ScoredMeme {
    ScoredMeme {
        meme: MemeMetadata {
            url: format!("https://e.com/{}", title.to_lowercase().replace(' ', "-")),
            image_url: format!("https://e.com/{}.jpg", title.to_lowercase().replace(' ', "-")),
            title: title.to_string(),
            ai_description: String::new(),
        },
        score,
    }
}

#[derive(Default)]
pub struct MockAcquirer {
    pages: HashMap<u32, Vec<RawMeme>>,
    limit: usize,
    stop_flag: Option<Arc<AtomicBool>>,
    pub calls: AtomicUsize,
}

impl MockAcquirer {
    pub fn new() -> Self {
        Self {
            limit: 16,
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page: u32, stubs: Vec<RawMeme>) -> Self {
        self.pages.insert(page, stubs);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Raises the given flag on every acquire, simulating an interrupt that
    /// lands while a page is in flight.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }
}

#[async_trait]
impl ContentAcquirer for MockAcquirer {
    async fn acquire(&self, page: u32) -> Result<Vec<RawMeme>, AcquisitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.stop_flag {
            flag.store(true, Ordering::SeqCst);
        }
        let stubs = self.pages.get(&page).cloned().unwrap_or_default();
        Ok(filter_and_cap(stubs, self.limit))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
pub struct MockEnricher {
    fail_titles: Vec<String>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, title: &str) -> Self {
        self.fail_titles.push(title.to_string());
        self
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    async fn describe(&self, meme: &RawMeme) -> Result<String, EnrichmentError> {
        if self.fail_titles.contains(&meme.title) {
            return Err(EnrichmentError::ProviderError("vision model refused".to_string()));
        }
        Ok(format!("caption for {}", meme.title))
    }
}

pub struct MockEmbedder {
    dimension: u64,
    fail_on: Vec<String>,
    wrong_dim_on: Vec<String>,
    pub calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: u64) -> Self {
        Self {
            dimension,
            fail_on: Vec::new(),
            wrong_dim_on: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail any embed whose input contains the given substring.
    pub fn failing_on(mut self, substring: &str) -> Self {
        self.fail_on.push(substring.to_string());
        self
    }

    /// Return a vector one element too long for matching inputs.
    pub fn wrong_dimension_on(mut self, substring: &str) -> Self {
        self.wrong_dim_on.push(substring.to_string());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.iter().any(|s| text.contains(s.as_str())) {
            return Err(EmbeddingError::ProviderError("status 500: boom".to_string()));
        }
        let len = if self.wrong_dim_on.iter().any(|s| text.contains(s.as_str())) {
            self.dimension + 1
        } else {
            self.dimension
        };
        Ok(vec![0.1; len as usize])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> u64 {
        self.dimension
    }
}

#[derive(Default)]
pub struct MockStore {
    hits: Vec<ScoredMeme>,
    fail_upsert_on_call: Option<usize>,
    fail_query: bool,
    pub stored: Mutex<Vec<MemeMetadata>>,
    pub ensure_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, hits: Vec<ScoredMeme>) -> Self {
        self.hits = hits;
        self
    }

    /// Fail the n-th upsert call (zero-based).
    pub fn failing_upsert_on_call(mut self, call: usize) -> Self {
        self.fail_upsert_on_call = Some(call);
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_query = true;
        self
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn ensure_index(&self) -> Result<(), VectorStoreError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(
        &self,
        embeddings: Vec<Vec<f32>>,
        memes: Vec<MemeMetadata>,
    ) -> Result<u64, VectorStoreError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert_on_call == Some(call) {
            return Err(VectorStoreError::UpsertError("connection reset".to_string()));
        }
        check_arity(&embeddings, &memes)?;
        let count = memes.len() as u64;
        self.stored.lock().unwrap().extend(memes);
        Ok(count)
    }

    async fn query(
        &self,
        _vector: Vec<f32>,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredMeme>, VectorStoreError> {
        if self.fail_query {
            return Err(VectorStoreError::QueryError("index offline".to_string()));
        }
        Ok(self
            .hits
            .iter()
            .filter(|h| min_score.is_none_or(|s| h.score >= s))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<Option<u64>, VectorStoreError> {
        Ok(Some(self.stored.lock().unwrap().len() as u64))
    }

    fn collection(&self) -> &str {
        "memes"
    }
}
