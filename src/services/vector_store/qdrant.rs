//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use std::collections::HashMap;
use uuid::Uuid;

use super::{VectorStore, check_arity, check_query_dimension};
use crate::error::VectorStoreError;
use crate::models::{MemeMetadata, ScoredMeme, VectorStoreConfig};

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig, embedding_dim: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.resolved_api_key() {
            builder = builder.api_key(api_key);
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    /// Dimension of the existing collection, or None if it doesn't exist.
    async fn existing_dimension(&self) -> Result<Option<u64>, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => {
                let dim = info
                    .result
                    .and_then(|r| r.config)
                    .and_then(|c| c.params)
                    .and_then(|p| p.vectors_config)
                    .and_then(|v| v.config)
                    .and_then(|cfg| match cfg {
                        qdrant_client::qdrant::vectors_config::Config::Params(params) => {
                            Some(params.size)
                        }
                        _ => None,
                    });
                Ok(dim)
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(VectorStoreError::IndexError(msg))
                }
            }
        }
    }

    fn string_payload(value: &qdrant_client::qdrant::Value) -> Option<String> {
        match &value.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn ensure_index(&self) -> Result<(), VectorStoreError> {
        match self.existing_dimension().await? {
            Some(dim) if dim == self.embedding_dim => return Ok(()),
            Some(dim) => {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.embedding_dim,
                    found: dim,
                });
            }
            None => {}
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        Ok(())
    }

    async fn upsert(
        &self,
        embeddings: Vec<Vec<f32>>,
        memes: Vec<MemeMetadata>,
    ) -> Result<u64, VectorStoreError> {
        check_arity(&embeddings, &memes)?;
        if embeddings.is_empty() {
            return Ok(0);
        }

        let points: Vec<PointStruct> = embeddings
            .into_iter()
            .zip(memes)
            .map(|(embedding, meme)| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("url".to_string(), meme.url.into());
                payload.insert("imageUrl".to_string(), meme.image_url.into());
                payload.insert("title".to_string(), meme.title.into());
                payload.insert("aiDescription".to_string(), meme.ai_description.into());

                PointStruct::new(Uuid::new_v4().to_string(), embedding, payload)
            })
            .collect();

        let stored = points.len() as u64;
        let upsert = UpsertPointsBuilder::new(&self.collection, points);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(stored)
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredMeme>, VectorStoreError> {
        check_query_dimension(&vector, self.embedding_dim)?;

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);

        if let Some(score) = min_score {
            search_builder = search_builder.score_threshold(score);
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        let hits = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let get = |key: &str| {
                    payload
                        .get(key)
                        .and_then(Self::string_payload)
                        .unwrap_or_default()
                };

                ScoredMeme {
                    meme: MemeMetadata {
                        url: get("url"),
                        image_url: get("imageUrl"),
                        title: get("title"),
                        ai_description: get("aiDescription"),
                    },
                    score: point.score,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self) -> Result<Option<u64>, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(Some(
                info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            )),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(VectorStoreError::IndexError(msg))
                }
            }
        }
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
