//! Locate a catalog entry in an extracted text layer.
//!
//! Reads fragments from a file (a JSON array of strings, or plain text with
//! one fragment per line), runs a search session over them and prints the
//! resulting state as JSON.
//!
//! Usage:
//!     pagemark-locate --fragments page.json --query "Matemática 8° Básico" [--isbn 978-...]

use anyhow::{Context, Result};
use clap::Parser;
use pagemark::{MemoryTextLayer, SearchHints, SearchSession, SessionConfig, TextFragment};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Find and mark a catalog entry in a page's text layer")]
struct Args {
    /// Fragment file: JSON array of strings, or one fragment per line
    #[arg(short, long)]
    fragments: PathBuf,

    /// Catalog entry to look for
    #[arg(short, long)]
    query: String,

    /// ISBN hint; a literal hit short-circuits text matching
    #[arg(long)]
    isbn: Option<String>,

    /// Brand/publisher hint
    #[arg(long)]
    marca: Option<String>,

    /// Session config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn read_fragments(path: &Path) -> Result<Vec<TextFragment>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading fragments from {}", path.display()))?;
    let texts: Vec<String> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw).context("parsing fragment JSON")?
    } else {
        raw.lines().map(str::to_string).collect()
    };
    Ok(TextFragment::from_texts(texts))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let layer = MemoryTextLayer::with_fragments(read_fragments(&args.fragments)?);
    let session = match &args.config {
        Some(path) => SearchSession::from_config_file(layer, path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SearchSession::with_config(layer, SessionConfig::default()),
    };
    let hints = SearchHints { isbn: args.isbn, marca: args.marca };

    if let Some(handle) = session.search(&args.query, Some(hints)) {
        handle.await.context("search task failed")?;
    }

    let state = session.state();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
