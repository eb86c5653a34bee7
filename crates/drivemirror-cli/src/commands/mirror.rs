//! Mirror command - One-way backup of the drive
//!
//! Provides the `drivemirror mirror` CLI command which:
//! 1. Loads and validates the configuration
//! 2. Applies command-line overrides
//! 3. Runs the sync, download and (with `--delete`) cleanup phases
//! 4. Streams progress events and prints a summary

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use drivemirror_core::config::Config;
use drivemirror_sync::{MirrorOptions, MirrorReport};
use tokio::sync::mpsc;

use super::{build_engine, ensure_valid, format_duration, plural, CommandContext};
use crate::output::{get_formatter, spawn_event_printer, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct MirrorCommand {
    /// Local mirror root (defaults to mirror.output_dir)
    pub output_dir: Option<PathBuf>,

    /// Reuse the existing listing cache instead of walking the drive
    #[arg(long)]
    pub cached: bool,

    /// Delete local files that are no longer on the drive
    #[arg(long)]
    pub delete: bool,

    /// Number of concurrent download workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Listing cache location
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

impl MirrorCommand {
    /// Run settings: configuration values overridden by flags
    pub fn options(&self, config: &Config) -> MirrorOptions {
        let mut options = MirrorOptions::from_config(config);
        if let Some(dir) = &self.output_dir {
            options.output_dir = dir.clone();
        }
        if let Some(cache) = &self.cache {
            options.cache_path = cache.clone();
        }
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        options.use_cache = self.cached;
        options.delete = self.delete;
        options
    }

    /// Execute the mirror command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let config = ctx.load_config()?;
        ensure_valid(&config)?;
        let options = self.options(&config);
        let formatter = get_formatter(ctx.format, ctx.quiet);

        tracing::info!(
            output_dir = %options.output_dir.display(),
            workers = options.workers,
            cached = options.use_cache,
            delete = options.delete,
            "Starting mirror run"
        );

        let engine = build_engine(&config, options);
        let (tx, rx) = mpsc::unbounded_channel();
        let printer = spawn_event_printer(ctx.format, ctx.quiet, rx);
        let result = engine.run(&tx).await;
        drop(tx);
        printer.await.context("Event printer failed")?;

        let report = result.context("Mirror run failed")?;
        print_report(formatter.as_ref(), ctx.format, &report);
        Ok(())
    }
}

fn print_report(formatter: &dyn OutputFormatter, format: OutputFormat, report: &MirrorReport) {
    let download = &report.download;
    if format == OutputFormat::Json {
        let mut json = serde_json::json!({
            "synced": report.synced,
            "records": download.total,
            "processed": download.processed,
            "skipped": download.skipped,
            "saved_variants": download.saved_variants,
            "failed_variants": download.failed_variants,
            "failed_records": download.failed_records,
            "duration_ms": report.duration_ms,
        });
        if let Some(cleanup) = &report.cleanup {
            json["cleanup"] = serde_json::json!({
                "scanned": cleanup.scanned,
                "orphans": cleanup.orphans,
                "deleted": cleanup.deleted,
                "failed": cleanup.failed,
                "pruned_dirs": cleanup.pruned_dirs,
            });
        }
        formatter.print_json(&json);
        return;
    }

    if download.saved_variants == 0 && download.failed_variants == 0 {
        formatter.success(&format!(
            "Already up to date ({})",
            format_duration(report.duration_ms)
        ));
    } else {
        formatter.success(&format!(
            "Mirror completed in {}",
            format_duration(report.duration_ms)
        ));
    }
    formatter.info(&format!(
        "Saved:   {} file{}",
        download.saved_variants,
        plural(download.saved_variants)
    ));
    formatter.info(&format!(
        "Skipped: {} up-to-date record{}",
        download.skipped,
        plural(download.skipped)
    ));
    if let Some(cleanup) = &report.cleanup {
        formatter.info(&format!(
            "Deleted: {} orphan{}",
            cleanup.deleted,
            plural(cleanup.deleted)
        ));
    }

    let failures = download.failed_variants + download.failed_records;
    if failures > 0 {
        formatter.error(&format!(
            "{failures} item{} could not be saved; see the warnings above",
            plural(failures)
        ));
    }
}
