use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::vector_store::VectorStore;
use crate::services::{OpenAiEmbedder, QueryService, create_backend};

#[derive(Debug, Args)]
pub struct SuggestArgs {
    #[arg(required = true, help = "Partial query text")]
    pub query: String,

    #[arg(long, short = 'n', help = "Maximum number of suggestions")]
    pub limit: Option<u32>,
}

pub async fn handle_suggest(args: SuggestArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let mut config = Config::load()?;
    let formatter = get_formatter(format);

    if let Some(limit) = args.limit {
        if limit == 0 {
            anyhow::bail!("limit must be at least 1");
        }
        config.search.suggestion_limit = limit;
    }

    let embedder =
        Arc::new(OpenAiEmbedder::new(&config.openai).context("failed to create embedding client")?);
    let store: Arc<dyn VectorStore> = Arc::from(
        create_backend(&config.vector_store, u64::from(config.openai.dimension))
            .await
            .context("failed to create vector store backend")?,
    );

    let service = QueryService::new(embedder, store, &config.search);
    let suggestions = service.suggestions(&args.query).await;

    print!("{}", formatter.format_suggestions(&suggestions));

    Ok(())
}
