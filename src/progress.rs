//! Bulk-run progress reporting.
//!
//! Reports observable progress during `widx index` so users see how much of
//! the batch is done and how fast it is moving. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use crate::models::BulkStats;

/// A single progress event for a bulk run.
#[derive(Clone, Debug)]
pub enum BulkProgressEvent {
    /// Scanner is walking the workspace; totals are unknown.
    Discovering { root: String },
    /// `n` of `total` files attempted; rate in files/sec over wall-clock
    /// time since the batch began.
    Processed {
        n: u64,
        total: u64,
        indexed: u64,
        skipped: u64,
        rate: f64,
    },
    /// The batch finished and the cache was persisted.
    Completed { stats: BulkStats, elapsed_secs: f64 },
}

/// Reports bulk progress. Implementations write to stderr (human or JSON).
pub trait BulkProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the worker pool drain loop.
    fn report(&self, event: BulkProgressEvent);
}

/// Human-friendly progress on stderr:
/// `index  [1,234/5,000] (24.7%)  indexed: 310, skipped: 920, 41.2 files/sec`.
pub struct StderrProgress;

impl BulkProgressReporter for StderrProgress {
    fn report(&self, event: BulkProgressEvent) {
        let line = match &event {
            BulkProgressEvent::Discovering { root } => {
                format!("index {}  discovering...\n", root)
            }
            BulkProgressEvent::Processed {
                n,
                total,
                indexed,
                skipped,
                rate,
            } => {
                let percent = if *total > 0 {
                    *n as f64 / *total as f64 * 100.0
                } else {
                    100.0
                };
                format!(
                    "index  [{}/{}] ({:.1}%)  indexed: {}, skipped: {}, {:.1} files/sec\n",
                    format_number(*n),
                    format_number(*total),
                    percent,
                    format_number(*indexed),
                    format_number(*skipped),
                    rate
                )
            }
            BulkProgressEvent::Completed {
                stats,
                elapsed_secs,
            } => format!(
                "index  done in {:.2}s  indexed: {}, skipped: {}, errors: {}\n",
                elapsed_secs,
                format_number(stats.indexed),
                format_number(stats.skipped),
                format_number(stats.errors)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BulkProgressReporter for JsonProgress {
    fn report(&self, event: BulkProgressEvent) {
        let obj = match &event {
            BulkProgressEvent::Discovering { root } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "root": root
            }),
            BulkProgressEvent::Processed {
                n,
                total,
                indexed,
                skipped,
                rate,
            } => serde_json::json!({
                "event": "progress",
                "phase": "indexing",
                "n": n,
                "total": total,
                "indexed": indexed,
                "skipped": skipped,
                "rate": rate
            }),
            BulkProgressEvent::Completed {
                stats,
                elapsed_secs,
            } => serde_json::json!({
                "event": "progress",
                "phase": "completed",
                "stats": stats,
                "elapsed_secs": elapsed_secs
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BulkProgressReporter for NoProgress {
    fn report(&self, _event: BulkProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the worker pool.
    pub fn reporter(&self) -> Box<dyn BulkProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
