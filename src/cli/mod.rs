//! CLI surface for the meme index.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Semantic meme search: index meme listings, then search them by meaning.
#[derive(Debug, Parser)]
#[command(name = "memedex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check infrastructure status (vector store, credentials)
    Status,

    /// Acquire, caption, embed, and store meme pages
    Index(commands::IndexArgs),

    /// Search indexed memes by meaning
    Search(commands::SearchArgs),

    /// Autocomplete-style title suggestions
    Suggest(commands::SuggestArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
