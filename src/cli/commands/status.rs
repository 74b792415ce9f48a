use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::create_backend;

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let openai_key_present = config.openai.resolved_api_key().is_some();

    let (vector_store_connected, stored_memes) =
        match create_backend(&config.vector_store, u64::from(config.openai.dimension)).await {
            Ok(store) => {
                let connected = store.health_check().await.unwrap_or(false);
                let count = if connected {
                    store.count().await.unwrap_or(None)
                } else {
                    None
                };
                (connected, count)
            }
            Err(_) => (false, None),
        };

    let backend = match config.acquisition.backend {
        crate::models::AcquisitionBackend::Listing => "listing",
        crate::models::AcquisitionBackend::Crawl => "crawl",
    };

    let status = StatusInfo {
        acquisition_backend: backend.to_string(),
        embedding_model: config.openai.embedding_model.clone(),
        embedding_dimension: config.openai.dimension,
        openai_key_present,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_url: config.vector_store.url.clone(),
        vector_store_connected,
        collection: config.vector_store.collection.clone(),
        stored_memes,
    };

    print!("{}", formatter.format_status(&status));

    if !openai_key_present || !vector_store_connected {
        eprintln!();
        if !openai_key_present {
            eprintln!("Warning: no OpenAI API key. Set OPENAI_API_KEY or openai.api_key.");
        }
        if !vector_store_connected {
            match config.vector_store.driver {
                VectorDriver::Qdrant => {
                    eprintln!("Warning: Qdrant not running. Start with: docker compose up -d qdrant");
                }
                VectorDriver::PostgreSQL => {
                    eprintln!("Warning: PostgreSQL not accessible. Check connection settings.");
                }
            }
        }
    }

    Ok(())
}
