//! Index command implementation.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::vector_store::VectorStore;
use crate::services::{IndexingPipeline, OpenAiCaptioner, OpenAiEmbedder, create_backend};
use crate::sources::{ContentAcquirer, create_acquirer};

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Single page number to index
    #[arg(long, short = 'p', conflicts_with_all = ["start", "end"])]
    pub page: Option<u32>,

    /// First page of a range
    #[arg(long, requires = "end")]
    pub start: Option<u32>,

    /// Last page of a range, inclusive
    #[arg(long, requires = "start")]
    pub end: Option<u32>,
}

pub async fn handle_index(
    args: IndexArgs,
    format: OutputFormat,
    verbose: bool,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let (start_page, end_page) = resolve_pages(&args, config.indexing.max_pages_per_run)?;

    let acquirer: Arc<dyn ContentAcquirer> =
        Arc::from(create_acquirer(&config).context("failed to create acquisition backend")?);
    let enricher = Arc::new(
        OpenAiCaptioner::new(&config.openai).context("failed to create caption client")?,
    );
    let embedder =
        Arc::new(OpenAiEmbedder::new(&config.openai).context("failed to create embedding client")?);
    let store: Arc<dyn VectorStore> = Arc::from(
        create_backend(&config.vector_store, u64::from(config.openai.dimension))
            .await
            .context("failed to create vector store backend")?,
    );

    if verbose {
        eprintln!("Acquisition backend: {}", acquirer.name());
        eprintln!("Vector store: {} ({})", config.vector_store.driver, store.collection());
    }

    let pipeline = IndexingPipeline::new(
        acquirer,
        enricher,
        embedder,
        store,
        Duration::from_secs(config.indexing.page_delay_secs),
    )
    .with_verbose(verbose);

    if start_page == end_page {
        let spinner = progress_spinner(format, format!("Indexing page {}...", start_page));
        let report = pipeline
            .run_page(start_page)
            .await
            .with_context(|| format!("page {} failed", start_page))?;
        spinner.finish_and_clear();

        print!("{}", formatter.format_page_report(&report));
    } else {
        let spinner = progress_spinner(
            format,
            format!("Indexing pages {}..{}...", start_page, end_page),
        );
        let report = pipeline.run_range(start_page, end_page, stop).await;
        spinner.finish_and_clear();

        print!("{}", formatter.format_range_report(&report));

        if report.completed_pages() == 0 && report.failed_pages() > 0 {
            anyhow::bail!("every page in the range failed");
        }
    }

    Ok(())
}

/// Normalize the page arguments into an inclusive range.
fn resolve_pages(args: &IndexArgs, max_pages: u32) -> Result<(u32, u32)> {
    let (start, end) = match (args.page, args.start, args.end) {
        (Some(page), None, None) => (page, page),
        (None, Some(start), Some(end)) => (start, end),
        (None, None, None) => anyhow::bail!("specify --page N or --start N --end M"),
        _ => anyhow::bail!("--page cannot be combined with --start/--end"),
    };

    if start == 0 {
        anyhow::bail!("pages are numbered from 1");
    }
    if end < start {
        anyhow::bail!("--end must be >= --start");
    }

    let pages = end - start + 1;
    if pages > max_pages {
        anyhow::bail!(
            "range spans {} pages; at most {} pages per run",
            pages,
            max_pages
        );
    }

    Ok((start, end))
}

fn progress_spinner(format: OutputFormat, message: String) -> ProgressBar {
    // Spinner goes to stderr; suppressed for JSON output to keep stdout
    // parseable even when stderr is redirected alongside it
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(page: Option<u32>, start: Option<u32>, end: Option<u32>) -> IndexArgs {
        IndexArgs { page, start, end }
    }

    #[test]
    fn test_single_page() {
        assert_eq!(resolve_pages(&args(Some(3), None, None), 50).unwrap(), (3, 3));
    }

    #[test]
    fn test_range() {
        assert_eq!(
            resolve_pages(&args(None, Some(1), Some(5)), 50).unwrap(),
            (1, 5)
        );
    }

    #[test]
    fn test_range_cap() {
        assert!(resolve_pages(&args(None, Some(1), Some(50)), 50).is_ok());
        assert!(resolve_pages(&args(None, Some(1), Some(51)), 50).is_err());
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(resolve_pages(&args(None, None, None), 50).is_err());
        assert!(resolve_pages(&args(Some(0), None, None), 50).is_err());
        assert!(resolve_pages(&args(None, Some(5), Some(2)), 50).is_err());
    }
}
