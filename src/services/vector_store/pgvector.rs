//! PostgreSQL/pgvector backend. The original deployment of this system
//! stored meme vectors in pgvector; this backend keeps that an option.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use std::time::Duration;

use super::{VectorStore, check_arity, check_query_dimension};
use crate::error::VectorStoreError;
use crate::models::{MemeMetadata, ScoredMeme, VectorStoreConfig};

pub struct PgVectorBackend {
    pool: PgPool,
    collection: String,
    embedding_dim: u64,
}

impl PgVectorBackend {
    pub async fn new(
        config: &VectorStoreConfig,
        embedding_dim: u64,
    ) -> Result<Self, VectorStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        let backend = Self {
            pool,
            collection: config.collection.clone(),
            embedding_dim,
        };

        backend.check_pgvector_extension().await?;

        Ok(backend)
    }

    async fn check_pgvector_extension(&self) -> Result<(), VectorStoreError> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        if result.is_none() {
            return Err(VectorStoreError::PgVectorExtensionError(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }

        Ok(())
    }

    async fn table_exists(&self) -> Result<bool, VectorStoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT table_name FROM information_schema.tables WHERE table_name = $1",
        )
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        Ok(row.is_some())
    }

    /// Declared dimension of the embedding column. For vector columns the
    /// type modifier stores the dimension directly.
    async fn existing_dimension(&self) -> Result<Option<u64>, VectorStoreError> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        let query = format!(
            "SELECT atttypmod FROM pg_attribute WHERE attrelid = '{}'::regclass AND attname = 'embedding'",
            self.collection
        );
        let row: Option<(i32,)> = sqlx::query_as(&query)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        Ok(row.map(|(typmod,)| typmod as u64))
    }
}

#[async_trait]
impl VectorStore for PgVectorBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
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

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                url TEXT NOT NULL,
                image_url TEXT NOT NULL,
                title TEXT NOT NULL,
                ai_description TEXT NOT NULL DEFAULT '',
                embedding vector({}) NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            self.collection, self.embedding_dim
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        let index_sql = format!(
            "CREATE INDEX IF NOT EXISTS {}_embedding_idx ON {} USING hnsw (embedding vector_cosine_ops)",
            self.collection, self.collection
        );
        sqlx::query(&index_sql)
            .execute(&self.pool)
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

        let query = format!(
            "INSERT INTO {} (id, url, image_url, title, ai_description, embedding, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.collection
        );

        // One transaction per batch: the page either lands whole or not at all
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        let stored = embeddings.len() as u64;
        let created_at = chrono::Utc::now().to_rfc3339();

        for (embedding, meme) in embeddings.into_iter().zip(memes) {
            let vector = Vector::from(embedding);

            sqlx::query(&query)
                .bind(uuid::Uuid::new_v4())
                .bind(&meme.url)
                .bind(&meme.image_url)
                .bind(&meme.title)
                .bind(&meme.ai_description)
                .bind(&vector)
                .bind(&created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        }

        tx.commit()
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

        let embedding = Vector::from(vector);

        let score_filter = match min_score {
            Some(score) => format!("WHERE (1 - (embedding <=> $1)) >= {}", score),
            None => String::new(),
        };

        let query = format!(
            r#"
            SELECT
                url,
                image_url,
                title,
                ai_description,
                1 - (embedding <=> $1) as score
            FROM {}
            {}
            ORDER BY embedding <=> $1
            LIMIT {}
            "#,
            self.collection, score_filter, limit
        );

        let rows = sqlx::query(&query)
            .bind(&embedding)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        let hits = rows
            .into_iter()
            .map(|row: PgRow| {
                let score: f64 = row.get("score");
                ScoredMeme {
                    meme: MemeMetadata {
                        url: row.get("url"),
                        image_url: row.get("image_url"),
                        title: row.get("title"),
                        ai_description: row.get("ai_description"),
                    },
                    score: score as f32,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self) -> Result<Option<u64>, VectorStoreError> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        let query = format!("SELECT COUNT(*) as count FROM {}", self.collection);
        let row: (i64,) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VectorStoreError::PostgresError(e.to_string()))?;

        Ok(Some(row.0 as u64))
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
