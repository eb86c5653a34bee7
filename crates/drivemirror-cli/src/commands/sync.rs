//! Sync command - Refresh the listing cache
//!
//! Provides the `drivemirror sync` CLI command which walks the whole drive
//! and rewrites the listing cache without downloading anything. A later
//! `drivemirror mirror --cached` then works from that cache.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use drivemirror_sync::MirrorOptions;
use tokio::sync::mpsc;

use super::{build_engine, ensure_valid, format_duration, plural, CommandContext};
use crate::output::{get_formatter, spawn_event_printer, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Listing cache location
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

impl SyncCommand {
    /// Execute the sync command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let config = ctx.load_config()?;
        ensure_valid(&config)?;
        let mut options = MirrorOptions::from_config(&config);
        if let Some(cache) = &self.cache {
            options.cache_path = cache.clone();
        }
        let cache_path = options.cache_path.clone();
        let formatter = get_formatter(ctx.format, ctx.quiet);

        let start = Instant::now();
        let engine = build_engine(&config, options);
        let (tx, rx) = mpsc::unbounded_channel();
        let printer = spawn_event_printer(ctx.format, ctx.quiet, rx);
        let result = engine.sync_cache(&tx).await;
        drop(tx);
        printer.await.context("Event printer failed")?;

        let total = result.context("Remote walk failed")?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if ctx.format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "files": total,
                "cache_path": cache_path.display().to_string(),
                "duration_ms": duration_ms,
            }));
        } else {
            formatter.success(&format!(
                "Cached {total} file{} in {}",
                plural(total),
                format_duration(duration_ms)
            ));
            formatter.info(&format!("Cache: {}", cache_path.display()));
        }
        Ok(())
    }
}
