use drivemirror_sync::MirrorEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter: Send {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
    fn event(&self, event: &MirrorEvent);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter {
    quiet: bool,
}

/// One line for an event, or `None` for events too chatty to print
///
/// The flag marks lines that go to stderr as warnings.
fn describe(event: &MirrorEvent) -> Option<(String, bool)> {
    let line = match event {
        MirrorEvent::SyncStarted => "Walking remote tree...".to_string(),
        MirrorEvent::FileFound { total, .. } if total % 1000 == 0 => {
            format!("  {total} files found")
        }
        MirrorEvent::SyncFinished { total } => format!("Cached {total} remote files"),
        MirrorEvent::DownloadStarted { total } => format!("Checking {total} records..."),
        MirrorEvent::VariantSaved { path, .. } => format!("  saved {path}"),
        MirrorEvent::VariantFailed { path, message, .. } => {
            return Some((format!("Failed to save {path}: {message}"), true))
        }
        MirrorEvent::RecordFailed { line, message } => {
            return Some((format!("Skipped cache line {line}: {message}"), true))
        }
        MirrorEvent::UnwantedRepository { path } => {
            return Some((
                format!("{path} belongs to a repository stored file by file; use a .git.json pointer"),
                true,
            ))
        }
        MirrorEvent::DownloadFinished { processed, total } => {
            format!("Processed {processed}/{total} records")
        }
        MirrorEvent::CleanupScanStarted => "Scanning local tree...".to_string(),
        MirrorEvent::CleanupScanFinished { orphans } => format!("Found {orphans} orphaned paths"),
        MirrorEvent::Deleted { path, .. } => format!("  deleted {path}"),
        MirrorEvent::DeleteFailed { path, message } => {
            return Some((format!("Failed to delete {path}: {message}"), true))
        }
        MirrorEvent::CleanupFinished { deleted, total } => {
            format!("Deleted {deleted}/{total} orphans")
        }
        _ => return None,
    };
    Some((line, false))
}

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
    fn event(&self, event: &MirrorEvent) {
        match describe(event) {
            Some((line, true)) => self.warn(&line),
            Some((line, false)) => self.info(&line),
            None => {}
        }
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
    fn event(&self, event: &MirrorEvent) {
        // one object per line
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
    }
}

pub fn get_formatter(format: OutputFormat, quiet: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter { quiet }),
    }
}

/// Prints events until every sender is dropped
pub fn spawn_event_printer(
    format: OutputFormat,
    quiet: bool,
    mut events: mpsc::UnboundedReceiver<MirrorEvent>,
) -> JoinHandle<()> {
    let formatter = get_formatter(format, quiet);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            formatter.event(&event);
        }
    })
}
