//! Live sync watcher.
//!
//! Bridges debounced OS filesystem notifications into the per-file
//! pipeline: a notify watcher delivers batches on its own thread, a bridge
//! thread converts them to [`FileEvent`]s on a channel, and one long-lived
//! tokio task drains the channel, re-runs the pipeline for each event, and
//! persists the cache after every event. This path bypasses the bulk worker
//! pool entirely.

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use notify_debouncer_full::notify::event::ModifyKind;
use notify_debouncer_full::notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::cache::ChangeCache;
use crate::indexer::process_file;
use crate::models::FileEvent;
use crate::scanner::ScanRules;
use crate::store::SearchableStore;

/// An armed watcher over a workspace root.
///
/// Exactly two states: *armed* (constructed, delivering events) and
/// *stopped* ([`stop`](LiveSyncWatcher::stop) consumed it). A failed
/// event-driven reindex leaves the cache entry unset; the file is corrected
/// on the next bulk run or the next edit.
pub struct LiveSyncWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    task: JoinHandle<()>,
}

impl LiveSyncWatcher {
    /// Subscribe to recursive change events under `root` and start the
    /// processing task.
    pub fn arm(
        root: &Path,
        rules: Arc<ScanRules>,
        cache: Arc<ChangeCache>,
        store: Arc<dyn SearchableStore>,
        max_chunk_chars: usize,
        debounce: Duration,
    ) -> Result<Self, notify_debouncer_full::notify::Error> {
        let (event_tx, mut event_rx) = tokio_mpsc::channel::<FileEvent>(1024);
        let (raw_tx, raw_rx) = mpsc::channel::<DebounceEventResult>();

        // Bridge thread: debouncer callback → tokio channel. Exits when the
        // debouncer is dropped and the raw channel disconnects.
        std::thread::spawn(move || {
            while let Ok(result) = raw_rx.recv() {
                match result {
                    Ok(events) => {
                        for event in events {
                            if let Some(file_event) = convert_event(&event) {
                                if event_tx.blocking_send(file_event).is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(errors) => {
                        for err in errors {
                            error!("watch error: {err}");
                        }
                    }
                }
            }
        });

        let task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                // A move re-indexes the destination only; the stale source
                // entry stays in the cache.
                let path = match event {
                    FileEvent::Created(path) | FileEvent::Modified(path) => path,
                    FileEvent::Moved { to, .. } => to,
                };
                if path.is_dir() || !rules.is_candidate(&path) {
                    continue;
                }
                let outcome = process_file(&path, &cache, store.as_ref(), max_chunk_chars).await;
                debug!(path = %path.display(), status = %outcome.status, "live sync");
                if let Err(err) = cache.persist() {
                    warn!("{err}");
                }
            }
        });

        let mut debouncer = new_debouncer(debounce, None, move |result| {
            let _ = raw_tx.send(result);
        })?;
        debouncer.watch(root, RecursiveMode::Recursive)?;

        Ok(Self { debouncer, task })
    }

    /// Unsubscribe and drain. Every event accepted before this call is
    /// processed before it returns, so shutdown never drops events
    /// mid-flush.
    pub async fn stop(self) {
        drop(self.debouncer);
        if let Err(err) = self.task.await {
            if err.is_panic() {
                error!("watcher task panicked: {err}");
            }
        }
    }
}

fn convert_event(event: &DebouncedEvent) -> Option<FileEvent> {
    let path = event.paths.first()?.clone();
    match &event.kind {
        EventKind::Create(_) => Some(FileEvent::Created(path)),
        EventKind::Modify(ModifyKind::Name(_)) => {
            if event.paths.len() >= 2 {
                Some(FileEvent::Moved {
                    from: path,
                    to: event.paths[1].clone(),
                })
            } else {
                // Rename half without a counterpart; treat as a plain change.
                Some(FileEvent::Modified(path))
            }
        }
        EventKind::Modify(_) => Some(FileEvent::Modified(path)),
        // Deletions are ignored: no eviction, stale entries are harmless.
        _ => None,
    }
}
