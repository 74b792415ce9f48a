use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::vector_store::VectorStore;
use crate::services::{OpenAiEmbedder, QueryService, create_backend};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<u32>,

    #[arg(long, help = "Minimum similarity score threshold (0.0-1.0)")]
    pub min_score: Option<f32>,
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    if let Some(limit) = args.limit {
        if limit == 0 {
            anyhow::bail!("limit must be at least 1");
        }
        config.search.limit = limit;
    }
    if let Some(score) = args.min_score {
        if !(0.0..=1.0).contains(&score) {
            anyhow::bail!("min_score must be between 0.0 and 1.0");
        }
        config.search.min_score = Some(score);
    }

    if verbose {
        eprintln!("Query: \"{}\"", args.query.trim());
        eprintln!("  Limit: {}", config.search.limit);
        if let Some(score) = config.search.min_score {
            eprintln!("  Min score: {score:.3}");
        }
    }

    let embedder =
        Arc::new(OpenAiEmbedder::new(&config.openai).context("failed to create embedding client")?);
    let store: Arc<dyn VectorStore> = Arc::from(
        create_backend(&config.vector_store, u64::from(config.openai.dimension))
            .await
            .context("failed to create vector store backend")?,
    );

    let service = QueryService::new(embedder, store, &config.search);
    let response = service.search(&args.query).await.context("search failed")?;

    let duration_ms = start_time.elapsed().as_millis() as u64;
    print!(
        "{}",
        formatter.format_search_results(args.query.trim(), &response, duration_ms)
    );

    Ok(())
}
