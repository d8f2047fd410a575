use chrono::{DateTime, Utc};

use crate::parser::{FolderParse, parse_folder_name};
use crate::problem::Platform;
use crate::reconcile::{ReconcileChange, ScannedProblem, reconcile};
use crate::source::{RepoCoordinate, SourceTree, SourceUrls, UpstreamError};
use crate::store::{RecordStore, StoreError};

/// Why a scan pass did not complete
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("could not save problems: {0}")]
    Store(#[from] StoreError),

    #[error("a scan is already running")]
    AlreadyRunning,
}

/// Problems found under one platform directory
#[derive(Debug, Default)]
pub struct PlatformScan {
    pub problems: Vec<ScannedProblem>,
    /// Directories whose names don't follow the platform's convention
    pub skipped: usize,
    /// Solutions whose source could not be fetched
    pub fetch_failures: usize,
}

/// Summary of a completed scan pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanReport {
    pub change: ReconcileChange,
    pub skipped: usize,
    pub fetch_failures: usize,
    pub last_modified: DateTime<Utc>,
}

/// List one platform directory and fetch every recognised solution
///
/// Entries that aren't directories, and directories whose names don't
/// parse, are skipped. A failed code fetch leaves `code` empty and the
/// problem is still reported.
///
/// # Errors
/// * Returns the listing error if the platform directory cannot be read
pub async fn collect_platform<S: SourceTree>(
    source: &S,
    coord: &RepoCoordinate,
    platform: Platform,
) -> Result<PlatformScan, UpstreamError> {
    let entries = source.list_platform(platform).await?;
    let mut scan = PlatformScan::default();

    for entry in entries.iter().filter(|e| e.is_dir()) {
        let parsed = match parse_folder_name(platform, &entry.name) {
            FolderParse::Matched(parsed) => parsed,
            FolderParse::Skipped => {
                log::debug!("Skipping {}/{}: unrecognised folder name", platform, entry.name);
                scan.skipped += 1;
                continue;
            }
        };

        let urls = SourceUrls::for_folder(coord, platform, &entry.name);
        let code = match source.fetch_raw(&urls.raw_source_file).await {
            Ok(code) => code,
            Err(e) => {
                log::warn!("Error fetching file content: {}", e);
                scan.fetch_failures += 1;
                String::new()
            }
        };

        scan.problems
            .push(ScannedProblem::new(platform, &entry.name, parsed, urls, code));
    }

    Ok(scan)
}

/// Run one full scan pass and persist the merged collection
///
/// Upstream is read without holding the store's write lock; the merge then
/// happens against a fresh read so edits made during the pass survive. If
/// any platform listing fails the pass is abandoned and the file is left as
/// it was.
pub async fn scan_pass<S: SourceTree>(
    source: &S,
    coord: &RepoCoordinate,
    store: &RecordStore,
) -> Result<ScanReport, ScanError> {
    let mut scanned = Vec::new();
    let mut skipped = 0;
    let mut fetch_failures = 0;

    for platform in Platform::ALL {
        let scan = collect_platform(source, coord, platform).await.map_err(|e| {
            log::error!("Error scanning {} directory: {}", platform, e);
            e
        })?;
        skipped += scan.skipped;
        fetch_failures += scan.fetch_failures;
        scanned.extend(scan.problems);
    }

    let (change, last_modified) = store.modify(|previous| {
        let merged = reconcile(previous, scanned, Utc::now());
        (merged.problems, merged.change)
    })?;

    log::info!(
        "All problems have been scanned and saved ({} added, {} updated, {} skipped)",
        change.added,
        change.updated,
        skipped
    );

    Ok(ScanReport {
        change,
        skipped,
        fetch_failures,
        last_modified,
    })
}

#[cfg(feature = "web")]
pub use periodic::{ScanTrigger, Scanner};

#[cfg(feature = "web")]
mod periodic {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::{MissedTickBehavior, interval};

    /// Something that can start a scan pass in the background
    pub trait ScanTrigger: Send + Sync {
        /// Start a pass; `false` if one is already running
        fn trigger(self: Arc<Self>) -> bool;
    }

    /// Clears the running flag when the pass finishes, even on panic
    struct RunGuard(Arc<AtomicBool>);

    impl Drop for RunGuard {
        fn drop(&mut self) {
            self.0.store(false, Ordering::Release);
        }
    }

    /// Scan passes over a `SourceTree`, at most one at a time
    pub struct Scanner<S> {
        source: S,
        coord: RepoCoordinate,
        store: Arc<RecordStore>,
        running: Arc<AtomicBool>,
    }

    impl<S: SourceTree + 'static> Scanner<S> {
        pub fn new(source: S, coord: RepoCoordinate, store: Arc<RecordStore>) -> Self {
            Scanner {
                source,
                coord,
                store,
                running: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn is_running(&self) -> bool {
            self.running.load(Ordering::Acquire)
        }

        fn try_begin(&self) -> Option<RunGuard> {
            self.running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| RunGuard(Arc::clone(&self.running)))
        }

        /// Run one pass now, unless another is still in flight
        pub async fn run_once(&self) -> Result<ScanReport, ScanError> {
            let guard = self.try_begin().ok_or(ScanError::AlreadyRunning)?;
            let result = scan_pass(&self.source, &self.coord, &self.store).await;
            drop(guard);
            result
        }

        /// Scan immediately, then every `period`
        ///
        /// A tick that lands while the previous pass is still running is
        /// skipped rather than starting a second pass.
        pub fn spawn_periodic(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
            tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !Arc::clone(&self).trigger() {
                        log::warn!("Previous scan still running, skipping this tick");
                    }
                }
            })
        }
    }

    impl<S: SourceTree + 'static> ScanTrigger for Scanner<S> {
        fn trigger(self: Arc<Self>) -> bool {
            let Some(guard) = self.try_begin() else {
                return false;
            };
            tokio::spawn(async move {
                if let Err(e) = scan_pass(&self.source, &self.coord, &self.store).await {
                    log::error!("Scan pass failed: {}", e);
                }
                drop(guard);
            });
            true
        }
    }
}
