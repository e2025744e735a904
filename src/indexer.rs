//! Index worker pool and per-file pipeline.
//!
//! [`IndexService`] owns the whole indexing core: it scans the workspace,
//! dispatches the per-file pipeline across bounded concurrency, commits
//! fingerprints to the shared [`ChangeCache`], and arms the live sync
//! watcher. The per-file pipeline is one function, [`process_file`], reused
//! verbatim by the bulk pool, the watcher, and ad hoc single-file resync.
//!
//! No per-file failure crosses the pool boundary; each is folded into that
//! file's [`ProcessOutcome`] and counted. The worst observable effect of any
//! single error is "this file is retried next time".

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cache::ChangeCache;
use crate::chunk;
use crate::config::Config;
use crate::error::{IndexError, StoreError};
use crate::models::{BulkStats, ChunkMeta, ProcessOutcome, ProcessStatus, StoredDocument};
use crate::progress::{BulkProgressEvent, BulkProgressReporter};
use crate::scanner::ScanRules;
use crate::store::{create_store, SearchableStore};
use crate::watcher::LiveSyncWatcher;

/// Upper bound on concurrent per-file jobs, so a large workspace cannot
/// flood the store backend with simultaneous requests.
const MAX_WORKERS: usize = 16;

fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * 2).clamp(1, MAX_WORKERS)
}

/// The indexing core: scanner + cache + chunker + worker pool + watcher,
/// wired to one searchable store.
///
/// Constructed from a [`Config`] and injected into whatever hosts it (the
/// CLI here, a service layer elsewhere). Explicit start/stop lifecycle; no
/// global instance.
pub struct IndexService {
    root: PathBuf,
    rules: Arc<ScanRules>,
    cache: Arc<ChangeCache>,
    store: Arc<dyn SearchableStore>,
    max_chunk_chars: usize,
    workers: usize,
    debounce: Duration,
    watcher: Option<LiveSyncWatcher>,
}

impl IndexService {
    pub fn new(config: &Config) -> Result<Self> {
        let root = config
            .workspace
            .root
            .canonicalize()
            .with_context(|| format!("Workspace root not found: {}", config.workspace.root.display()))?;
        let rules = Arc::new(ScanRules::new(
            &root,
            &config.workspace.cache_file,
            &config.workspace.exclude_globs,
        )?);
        let cache = Arc::new(ChangeCache::load(root.join(&config.workspace.cache_file)));
        let store = create_store(&config.store)?;

        Ok(Self {
            root,
            rules,
            cache,
            store,
            max_chunk_chars: config.indexing.max_chunk_chars,
            workers: config.indexing.max_workers.unwrap_or_else(default_workers),
            debounce: Duration::from_millis(config.watcher.debounce_ms),
            watcher: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    /// Full pass over the workspace, then arm the live sync watcher.
    pub async fn start(&mut self, reporter: &dyn BulkProgressReporter) -> Result<BulkStats> {
        let stats = self.run_bulk(reporter).await;
        self.arm_watcher()?;
        Ok(stats)
    }

    /// Subscribe the live sync watcher. Idempotent while armed.
    pub fn arm_watcher(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let watcher = LiveSyncWatcher::arm(
            &self.root,
            Arc::clone(&self.rules),
            Arc::clone(&self.cache),
            Arc::clone(&self.store),
            self.max_chunk_chars,
            self.debounce,
        )
        .context("Failed to arm filesystem watcher")?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Unsubscribe the watcher and drain its queue. Completes before
    /// shutdown so no accepted event is dropped mid-flush.
    pub async fn stop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop().await;
        }
    }

    /// Process every candidate file across bounded concurrency and block
    /// until all have been attempted.
    ///
    /// Outcomes are collected as jobs complete, not in submission order. A
    /// job that panics is counted as an error and never aborts the batch.
    /// The cache is persisted exactly once, at the end of the batch.
    pub async fn run_bulk(&self, reporter: &dyn BulkProgressReporter) -> BulkStats {
        let started = Instant::now();
        reporter.report(BulkProgressEvent::Discovering {
            root: self.root.display().to_string(),
        });

        let rules = Arc::clone(&self.rules);
        let files = match tokio::task::spawn_blocking(move || rules.scan()).await {
            Ok(files) => files,
            Err(err) => {
                warn!("scan task failed: {err}");
                Vec::new()
            }
        };

        let total = files.len() as u64;
        let mut stats = BulkStats {
            total,
            ..BulkStats::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut jobs: JoinSet<ProcessOutcome> = JoinSet::new();
        for path in files {
            let semaphore = Arc::clone(&semaphore);
            let cache = Arc::clone(&self.cache);
            let store = Arc::clone(&self.store);
            let max_chunk_chars = self.max_chunk_chars;
            jobs.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProcessOutcome {
                            path: path.to_string_lossy().into_owned(),
                            status: ProcessStatus::Error,
                            fingerprint: String::new(),
                        }
                    }
                };
                process_file(&path, &cache, store.as_ref(), max_chunk_chars).await
            });
        }

        let report_every = (total / 10).max(1);
        let mut attempted = 0u64;
        while let Some(joined) = jobs.join_next().await {
            attempted += 1;
            match joined {
                Ok(outcome) => match outcome.status {
                    ProcessStatus::Indexed => stats.indexed += 1,
                    ProcessStatus::Skipped => stats.skipped += 1,
                    ProcessStatus::EmptyOrUnreadable | ProcessStatus::Error => stats.errors += 1,
                },
                Err(err) => {
                    warn!("index job failed: {err}");
                    stats.errors += 1;
                }
            }
            if attempted % report_every == 0 || attempted == total {
                let elapsed = started.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    attempted as f64 / elapsed
                } else {
                    0.0
                };
                reporter.report(BulkProgressEvent::Processed {
                    n: attempted,
                    total,
                    indexed: stats.indexed,
                    skipped: stats.skipped,
                    rate,
                });
            }
        }

        if let Err(err) = self.cache.persist() {
            warn!("{err}");
        }
        reporter.report(BulkProgressEvent::Completed {
            stats,
            elapsed_secs: started.elapsed().as_secs_f64(),
        });
        stats
    }

    /// Re-run the per-file pipeline for one path, outside the bulk pool.
    pub async fn process_single(&self, path: &Path) -> ProcessOutcome {
        process_file(path, &self.cache, self.store.as_ref(), self.max_chunk_chars).await
    }

    /// Nearest-match query against the store.
    pub async fn query(&self, text: &str, top_n: usize) -> Result<Vec<StoredDocument>, StoreError> {
        self.store.query(text, top_n).await
    }
}

/// The per-file pipeline: fingerprint → skip check → read → chunk → write.
///
/// The cache entry is committed only after every chunk has been written to
/// the store in this invocation; any earlier exit leaves the entry
/// untouched, so the file is retried on the next run instead of being
/// silently marked done.
pub(crate) async fn process_file(
    path: &Path,
    cache: &ChangeCache,
    store: &dyn SearchableStore,
    max_chunk_chars: usize,
) -> ProcessOutcome {
    let key = path.to_string_lossy().into_owned();
    let fingerprint = ChangeCache::fingerprint_of(path);

    if cache.is_unchanged(&key, &fingerprint) {
        return ProcessOutcome {
            path: key,
            status: ProcessStatus::Skipped,
            fingerprint,
        };
    }

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(source) => {
            debug!(
                "{}",
                IndexError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            );
            return ProcessOutcome {
                path: key,
                status: ProcessStatus::EmptyOrUnreadable,
                fingerprint,
            };
        }
    };
    if content.trim().is_empty() {
        return ProcessOutcome {
            path: key,
            status: ProcessStatus::EmptyOrUnreadable,
            fingerprint,
        };
    }

    // Chunks are written strictly in order; a later chunk's presence in the
    // store presumes every earlier chunk of this file already succeeded.
    for chunk in &chunk::split(&key, &content, max_chunk_chars) {
        let meta = ChunkMeta {
            path: key.clone(),
            chunk_index: chunk.index,
        };
        if let Err(source) = store.upsert(&chunk.id(), &chunk.text, &meta).await {
            warn!(
                "{}",
                IndexError::StoreWrite {
                    chunk_id: chunk.id(),
                    source,
                }
            );
            return ProcessOutcome {
                path: key,
                status: ProcessStatus::Error,
                fingerprint,
            };
        }
    }

    cache.record(&key, &fingerprint);
    ProcessOutcome {
        path: key,
        status: ProcessStatus::Indexed,
        fingerprint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::progress::NoProgress;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store double whose upserts start failing at a given call count.
    struct FailingStore {
        calls: AtomicUsize,
        fail_from: usize,
    }

    impl FailingStore {
        fn new(fail_from: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_from,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchableStore for FailingStore {
        async fn upsert(&self, _id: &str, _text: &str, _meta: &ChunkMeta) -> Result<(), StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_from {
                Err(StoreError::Upsert("injected failure".to_string()))
            } else {
                Ok(())
            }
        }

        async fn query(&self, _text: &str, _top_n: usize) -> Result<Vec<StoredDocument>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn cache_in(dir: &Path) -> ChangeCache {
        ChangeCache::load(dir.join(".widx-cache.json"))
    }

    #[tokio::test]
    async fn pipeline_indexes_and_commits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "x".repeat(1500)).unwrap();

        let cache = cache_in(dir.path());
        let store = InMemoryStore::new();
        let outcome = process_file(&file, &cache, &store, 2000).await;

        assert_eq!(outcome.status, ProcessStatus::Indexed);
        assert!(!outcome.fingerprint.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(cache.get(&outcome.path).as_deref(), Some(outcome.fingerprint.as_str()));
    }

    #[tokio::test]
    async fn pipeline_skips_unchanged_without_store_io() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "content here").unwrap();

        let cache = cache_in(dir.path());
        let store = FailingStore::new(0); // any store call would fail
        let fp = ChangeCache::fingerprint_of(&file);
        cache.record(&file.to_string_lossy(), &fp);

        let outcome = process_file(&file, &cache, &store, 2000).await;
        assert_eq!(outcome.status, ProcessStatus::Skipped);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn blank_content_is_error_or_empty_and_leaves_cache_unset() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blank.py");
        fs::write(&file, "   \n\t\n").unwrap();

        let cache = cache_in(dir.path());
        let store = InMemoryStore::new();
        let outcome = process_file(&file, &cache, &store, 2000).await;

        assert_eq!(outcome.status, ProcessStatus::EmptyOrUnreadable);
        assert!(store.is_empty());
        assert!(cache.get(&outcome.path).is_none());
    }

    #[tokio::test]
    async fn missing_file_is_error_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let store = InMemoryStore::new();
        let outcome = process_file(&dir.path().join("gone.py"), &cache, &store, 2000).await;
        assert_eq!(outcome.status, ProcessStatus::EmptyOrUnreadable);
        assert_eq!(outcome.fingerprint, "");
    }

    #[tokio::test]
    async fn first_failed_chunk_aborts_the_rest_and_skips_cache_commit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.py");
        // 5 chunks of 100 chars
        fs::write(&file, "y".repeat(500)).unwrap();

        let cache = cache_in(dir.path());
        let store = FailingStore::new(2); // chunks 0 and 1 succeed, 2 fails

        let outcome = process_file(&file, &cache, &store, 100).await;
        assert_eq!(outcome.status, ProcessStatus::Error);
        // chunk 2 was attempted and failed; chunks 3 and 4 never reached the store
        assert_eq!(store.calls(), 3);
        assert!(cache.get(&outcome.path).is_none());

        // A later run reprocesses the whole file from chunk 0.
        let store = InMemoryStore::new();
        let outcome = process_file(&file, &cache, &store, 100).await;
        assert_eq!(outcome.status, ProcessStatus::Indexed);
        assert_eq!(store.len(), 5);
    }

    fn service_for(dir: &Path) -> IndexService {
        let config = Config::for_root(dir.to_path_buf());
        IndexService::new(&config).unwrap()
    }

    #[tokio::test]
    async fn run_bulk_is_idempotent_on_an_unchanged_workspace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "alpha file body").unwrap();
        fs::write(dir.path().join("b.md"), "beta file body").unwrap();

        let service = service_for(dir.path());
        let first = service.run_bulk(&NoProgress).await;
        assert_eq!(first.total, 2);
        assert_eq!(first.indexed, 2);
        assert_eq!(first.errors, 0);

        let second = service.run_bulk(&NoProgress).await;
        assert_eq!(second.indexed, 0);
        assert_eq!(second.skipped, 2);
    }

    #[tokio::test]
    async fn run_bulk_reindexes_exactly_the_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        fs::write(&a, "original a").unwrap();
        fs::write(&b, "original b").unwrap();

        let service = service_for(dir.path());
        service.run_bulk(&NoProgress).await;
        // Cache keys are canonicalized, so derive them from the service root.
        let b_key = service.root().join("b.py").to_string_lossy().into_owned();
        let b_fp_before = service.cache().get(&b_key).unwrap();

        // Grow the file so the fingerprint changes even on coarse mtimes.
        fs::write(&a, "rewritten a with more bytes").unwrap();

        let stats = service.run_bulk(&NoProgress).await;
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(service.cache().get(&b_key).unwrap(), b_fp_before);
    }

    #[tokio::test]
    async fn run_bulk_contains_per_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.py"), "fine").unwrap();
        fs::write(dir.path().join("empty.py"), "").unwrap();

        let service = service_for(dir.path());
        let stats = service.run_bulk(&NoProgress).await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.errors, 1);
    }

    #[tokio::test]
    async fn run_bulk_persists_cache_once_at_the_end() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "body").unwrap();

        let service = service_for(dir.path());
        service.run_bulk(&NoProgress).await;

        let reloaded = ChangeCache::load(service.root().join(".widx-cache.json"));
        assert_eq!(reloaded.len(), 1);
    }

    #[tokio::test]
    async fn query_delegates_to_the_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "the searchable needle text").unwrap();

        let service = service_for(dir.path());
        service.run_bulk(&NoProgress).await;

        let hits = service.query("needle", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.chunk_index, 0);
        assert!(hits[0].text.contains("needle"));
    }
}
