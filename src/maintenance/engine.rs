//! Maintenance engine: re-resolves every stored link and records liveness.
//!
//! A run lists all links, shuffles them, and works through them in batches.
//! Members of one batch resolve concurrently; batches run strictly one after
//! another with a cooldown in between. Each link gets its own retry loop and
//! its outcome is written back to the store.
//!
//! # Example
//!
//! ```no_run
//! use sharekeeper_core::maintenance::{MaintenanceEngine, MaintenanceSettings};
//! use sharekeeper_core::resolver::{build_default_resolver, ResolverHttpSettings, DEFAULT_RESOLVE_DEADLINE};
//! use sharekeeper_core::store::MemoryLinkStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = build_default_resolver(&ResolverHttpSettings::default(), DEFAULT_RESOLVE_DEADLINE)?;
//! let engine = MaintenanceEngine::new(
//!     Arc::new(MemoryLinkStore::new()),
//!     Arc::new(resolver),
//!     MaintenanceSettings::default(),
//! )?;
//! let stats = engine.run_once().await?;
//! println!("Active: {}, Failed: {}", stats.active(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy, resolve_with_retry};
use crate::resolver::LinkResolver;
use crate::store::{LinkStore, StoreError};

/// Default number of links resolved concurrently in one batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default pause between two batches.
pub const DEFAULT_BATCH_COOLDOWN: Duration = Duration::from_secs(5);

/// Upper bound on the batch size.
const MAX_BATCH_SIZE: usize = 100;

/// Error type for maintenance engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid batch size provided.
    #[error("invalid batch size {value}: must be between 1 and {MAX_BATCH_SIZE}")]
    InvalidBatchSize {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Another run holds the run guard.
    #[error("a maintenance run is already in progress")]
    AlreadyRunning,

    /// Listing links failed, so the run could not start.
    #[error("link store error: {0}")]
    Store(#[from] StoreError),
}

/// Tuning knobs for a maintenance run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSettings {
    /// Links resolved concurrently per batch.
    pub batch_size: usize,
    /// Retry bound and delay applied to each link.
    pub retry: RetryPolicy,
    /// Pause between consecutive batches.
    pub batch_cooldown: Duration,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY),
            batch_cooldown: DEFAULT_BATCH_COOLDOWN,
        }
    }
}

/// Statistics from one maintenance run.
///
/// Uses atomic counters so concurrent link tasks in a batch can update them
/// through a shared reference.
#[derive(Debug, Default)]
pub struct RunStats {
    total: AtomicUsize,
    active: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    skipped_writes: AtomicUsize,
}

impl RunStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of links the run started with.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Returns the number of links that resolved.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns the number of links that exhausted their attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of retry attempts made across all links.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Returns the number of outcomes not written back (link deleted or store error).
    #[must_use]
    pub fn skipped_writes(&self) -> usize {
        self.skipped_writes.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_active(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped_writes(&self) {
        self.skipped_writes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds the single run slot; releases it on drop.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    fn try_acquire(running: &Arc<AtomicBool>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                running: Arc::clone(running),
            })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Re-resolves the whole link set with bounded concurrency.
///
/// # Concurrency Model
///
/// - At most one run at a time; a second trigger while a run is active is a no-op
/// - Inside a run, one batch at a time with at most `batch_size` resolutions in flight
/// - The link store is the only shared mutable state
///
/// Cloning is cheap and clones share the run slot.
#[derive(Clone)]
pub struct MaintenanceEngine {
    store: Arc<dyn LinkStore>,
    resolver: Arc<dyn LinkResolver>,
    settings: MaintenanceSettings,
    running: Arc<AtomicBool>,
}

impl MaintenanceEngine {
    /// Creates an engine over a store and a resolver.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidBatchSize`] if `batch_size` is outside
    /// 1 to 100.
    #[instrument(level = "debug", skip(store, resolver))]
    pub fn new(
        store: Arc<dyn LinkStore>,
        resolver: Arc<dyn LinkResolver>,
        settings: MaintenanceSettings,
    ) -> Result<Self, EngineError> {
        if !(1..=MAX_BATCH_SIZE).contains(&settings.batch_size) {
            return Err(EngineError::InvalidBatchSize {
                value: settings.batch_size,
            });
        }

        Ok(Self {
            store,
            resolver,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the configured settings.
    #[must_use]
    pub fn settings(&self) -> &MaintenanceSettings {
        &self.settings
    }

    /// Returns true while a run holds the run slot.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Performs one full run and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] when another run is active, or
    /// [`EngineError::Store`] when the link list cannot be read. Individual
    /// link failures never fail the run.
    pub async fn run_once(&self) -> Result<RunStats, EngineError> {
        let guard = RunGuard::try_acquire(&self.running).ok_or(EngineError::AlreadyRunning)?;
        self.run_guarded(guard).await
    }

    /// Starts a run in the background and returns immediately.
    ///
    /// Returns `None` (after logging) when a run is already active.
    pub fn trigger(&self) -> Option<JoinHandle<Result<RunStats, EngineError>>> {
        let Some(guard) = RunGuard::try_acquire(&self.running) else {
            info!("maintenance run already in progress; trigger ignored");
            return None;
        };

        let engine = self.clone();
        Some(tokio::spawn(async move {
            let result = engine.run_guarded(guard).await;
            if let Err(e) = &result {
                error!(error = %e, "maintenance run failed");
            }
            result
        }))
    }

    #[instrument(skip(self, _guard), fields(batch_size = self.settings.batch_size))]
    async fn run_guarded(&self, _guard: RunGuard) -> Result<RunStats, EngineError> {
        let stats = RunStats::new();

        let mut urls: Vec<String> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .map(|link| link.url)
            .collect();
        urls.shuffle(&mut rand::thread_rng());
        stats.total.store(urls.len(), Ordering::SeqCst);

        info!(links = urls.len(), "starting maintenance run");

        let batch_count = urls.len().div_ceil(self.settings.batch_size);
        for (index, batch) in urls.chunks(self.settings.batch_size).enumerate() {
            debug!(batch = index + 1, batch_count, size = batch.len(), "processing batch");

            join_all(batch.iter().map(|url| self.maintain_link(url, &stats))).await;

            if index + 1 < batch_count && !self.settings.batch_cooldown.is_zero() {
                debug!(
                    cooldown_ms = self.settings.batch_cooldown.as_millis(),
                    "cooling down before next batch"
                );
                tokio::time::sleep(self.settings.batch_cooldown).await;
            }
        }

        info!(
            total = stats.total(),
            active = stats.active(),
            failed = stats.failed(),
            retried = stats.retried(),
            skipped_writes = stats.skipped_writes(),
            "maintenance run complete"
        );

        Ok(stats)
    }

    /// Resolves one link and writes its outcome back.
    ///
    /// `active`/`failed` only count outcomes that were persisted.
    #[instrument(skip(self, stats))]
    async fn maintain_link(&self, url: &str, stats: &RunStats) {
        let outcome =
            resolve_with_retry(self.resolver.as_ref(), url, &self.settings.retry, stats).await;
        let checked_at = Utc::now();

        match &outcome {
            Ok(resolved) => {
                info!(direct_url = %resolved.url, strategy = %resolved.strategy, "link active");
            }
            Err(failure) => {
                warn!(
                    attempts = failure.attempts,
                    error = %failure.last_error.reason(),
                    "link failed after all attempts"
                );
            }
        }

        // Re-read so a link removed mid-run stays removed.
        let mut link = match self.store.get(url).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                debug!("link deleted during run; skipping write-back");
                stats.increment_skipped_writes();
                return;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "failed to re-read link; skipping write-back"
                );
                stats.increment_skipped_writes();
                return;
            }
        };

        let resolved = outcome.is_ok();
        match outcome {
            Ok(_) => link.record_success(checked_at),
            Err(failure) => link.record_failure(
                &failure.last_error.reason(),
                failure.attempts,
                checked_at,
            ),
        }

        match self.store.set(&link).await {
            Ok(()) if resolved => stats.increment_active(),
            Ok(()) => stats.increment_failed(),
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "failed to write link status"
                );
                stats.increment_skipped_writes();
            }
        }
    }
}

impl std::fmt::Debug for MaintenanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceEngine")
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
