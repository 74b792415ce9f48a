//! Query path: free text in, ranked memes out.

use std::sync::Arc;

use crate::error::SearchError;
use crate::models::{SearchConfig, SearchResponse};
use crate::services::embedding::EmbeddingProvider;
use crate::services::vector_store::VectorStore;

/// Composes the embedding provider and vector store into the search-facing
/// contract. Stateless; safe to use concurrently with indexing.
pub struct QueryService {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    limit: u64,
    suggestion_limit: u64,
    min_score: Option<f32>,
}

impl QueryService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            limit: u64::from(config.limit),
            suggestion_limit: u64::from(config.suggestion_limit),
            min_score: config.min_score,
        }
    }

    /// Full search: thresholded, ranked parallel meme/score arrays.
    ///
    /// A blank query returns an empty result set without touching the
    /// embedding provider.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResponse::default());
        }

        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .store
            .query(embedding, self.limit, self.min_score)
            .await?;

        Ok(SearchResponse::from_hits(hits))
    }

    /// Autocomplete variant: distinct titles in first-occurrence order.
    ///
    /// Never fails; a blank query or any internal error yields an empty
    /// list, since suggestion consumers have no use for an error.
    pub async fn suggestions(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Warning: suggestion embedding failed: {}", e);
                return Vec::new();
            }
        };

        let hits = match self.store.query(embedding, self.suggestion_limit, None).await {
            Ok(hits) => hits,
            Err(e) => {
                eprintln!("Warning: suggestion query failed: {}", e);
                return Vec::new();
            }
        };

        let mut titles = Vec::new();
        for hit in hits {
            if !titles.contains(&hit.meme.title) {
                titles.push(hit.meme.title);
            }
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::services::mocks::{MockEmbedder, MockStore, hit};

    fn service(embedder: Arc<MockEmbedder>, store: MockStore) -> QueryService {
        QueryService::new(embedder, Arc::new(store), &SearchConfig::default())
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let embedder = Arc::new(MockEmbedder::new(4));
        let svc = service(embedder.clone(), MockStore::new());

        let response = svc.search("   ").await.unwrap();
        assert!(response.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

        let suggestions = svc.suggestions("").await;
        assert!(suggestions.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_applies_threshold() {
        let embedder = Arc::new(MockEmbedder::new(4));
        let store = MockStore::new().with_hits(vec![
            hit("Drake Hotline Bling", 0.81),
            hit("Distracted Boyfriend", 0.30),
        ]);
        let svc = service(embedder, store);

        // Default min_score is 0.5
        let response = svc.search("reaction meme").await.unwrap();
        assert_eq!(response.memes.len(), 1);
        assert_eq!(response.memes[0].title, "Drake Hotline Bling");
        assert_eq!(response.scores, vec![0.81]);
    }

    #[tokio::test]
    async fn test_search_preserves_rank_order() {
        let embedder = Arc::new(MockEmbedder::new(4));
        let store = MockStore::new().with_hits(vec![
            hit("First", 0.9),
            hit("Second", 0.8),
            hit("Third", 0.7),
        ]);
        let svc = service(embedder, store);

        let response = svc.search("memes").await.unwrap();
        let titles: Vec<&str> = response.memes.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
        assert_eq!(response.scores, vec![0.9, 0.8, 0.7]);
    }

    #[tokio::test]
    async fn test_search_propagates_embedding_error() {
        let embedder = Arc::new(MockEmbedder::new(4).failing_on("doomed"));
        let svc = service(embedder, MockStore::new());

        let err = svc.search("doomed query").await.unwrap_err();
        assert!(matches!(err, SearchError::EmbeddingError(_)));
    }

    #[tokio::test]
    async fn test_suggestions_dedupe_in_first_occurrence_order() {
        let embedder = Arc::new(MockEmbedder::new(4));
        let store = MockStore::new().with_hits(vec![
            hit("Drake", 0.9),
            hit("Wojak", 0.8),
            hit("Drake", 0.7),
            hit("Pepe", 0.6),
        ]);
        let svc = service(embedder, store);

        let suggestions = svc.suggestions("d").await;
        assert_eq!(suggestions, ["Drake", "Wojak", "Pepe"]);
    }

    #[tokio::test]
    async fn test_suggestions_never_error() {
        let embedder = Arc::new(MockEmbedder::new(4));
        let svc = service(embedder, MockStore::new().failing_queries());
        assert!(svc.suggestions("drake").await.is_empty());

        let embedder = Arc::new(MockEmbedder::new(4).failing_on("drake"));
        let svc = service(embedder, MockStore::new());
        assert!(svc.suggestions("drake").await.is_empty());
    }
}
