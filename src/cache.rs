//! Time-bounded workbook cache.
//!
//! Holds one workbook for the whole process. A lookup inside the TTL window is
//! served from memory; the first lookup after expiry downloads and parses the
//! workbook again. The slot lock is never held while downloading, so two
//! callers that observe expiry at the same time may both fetch; the last one
//! to finish wins.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{Result, ViewerError};
use crate::fetcher::Fetcher;
use crate::matcher::{self, MatchResult};
use crate::query::{self, Intent};
use crate::workbook::{Workbook, parse_workbook};

/// How long a downloaded workbook is served before it is fetched again.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
struct CachedWorkbook {
    fetched_at: Instant,
    workbook: Arc<Workbook>,
}

/// Process-wide holder of the last downloaded workbook
///
/// Wraps a [`Fetcher`] and the workbook URL. The cached copy is served while
/// it is younger than `ttl`; after that the next caller downloads and parses
/// it again. The slot lock is only taken for reads and swaps, never across a
/// download.
///
/// # Examples
/// ```no_run
/// use sheetgate::{CACHE_TTL, HttpFetcher, WorkbookCache};
/// use sheetgate::fetcher::FETCH_TIMEOUT;
///
/// # async fn demo() -> sheetgate::Result<()> {
/// let fetcher = HttpFetcher::new(FETCH_TIMEOUT)?;
/// let cache = WorkbookCache::new(fetcher, "https://example.com/book.xlsx", CACHE_TTL);
/// let workbook = cache.load().await?;
/// println!("sheets: {:?}", workbook.sheet_names());
/// # Ok(())
/// # }
/// ```
pub struct WorkbookCache<F: Fetcher> {
    fetcher: F,
    url: String,
    ttl: Duration,
    slot: RwLock<Option<CachedWorkbook>>,
}

impl<F: Fetcher> WorkbookCache<F> {
    /// Create an empty cache; nothing is downloaded until the first lookup.
    ///
    /// # Arguments
    /// * `fetcher` - Source of the workbook bytes
    /// * `url` - Workbook location passed to the fetcher
    /// * `ttl` - How long a downloaded copy is served
    pub fn new(fetcher: F, url: impl Into<String>, ttl: Duration) -> Self {
        WorkbookCache {
            fetcher,
            url: url.into(),
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The cached workbook if it is still fresh at `now`, otherwise a new one.
    ///
    /// A failed refresh empties the slot and returns the error; the previous
    /// workbook is not served in its place.
    pub async fn get_or_refresh(&self, now: Instant) -> Result<Arc<Workbook>> {
        if let Some(workbook) = self.fresh(now) {
            return Ok(workbook);
        }

        log::info!("Refreshing workbook from {}", self.url);
        match self.refresh().await {
            Ok(workbook) => {
                let workbook = Arc::new(workbook);
                self.store(Some(CachedWorkbook {
                    fetched_at: now,
                    workbook: Arc::clone(&workbook),
                }));
                log::info!(
                    "Workbook loaded with sheets {:?}",
                    workbook.sheet_names()
                );
                Ok(workbook)
            }
            Err(err) => {
                log::error!("Workbook refresh failed: {}", err);
                self.store(None);
                Err(err)
            }
        }
    }

    /// Shorthand for [`get_or_refresh`](Self::get_or_refresh) at the current instant.
    pub async fn load(&self) -> Result<Arc<Workbook>> {
        self.get_or_refresh(Instant::now()).await
    }

    /// Route a raw query and run it against the cached workbook.
    ///
    /// Invalid queries are rejected before the workbook is loaded.
    ///
    /// # Arguments
    /// * `raw` - The query line as typed
    ///
    /// # Returns
    /// * `Result<(Intent, MatchResult)>` - The routed intent with its result, or
    ///   the download, parse or lookup error
    pub async fn answer(&self, raw: &str) -> Result<(Intent, MatchResult)> {
        let query = query::route(raw);
        log::debug!("Routed {:?} to {}", raw, query.intent());
        if query.intent() == Intent::Invalid {
            return Err(ViewerError::InvalidQuery);
        }

        let workbook = self.load().await?;
        let result = matcher::run(&workbook, &query)?;
        Ok((query.intent(), result))
    }

    /// Forget the cached workbook so the next lookup fetches again.
    pub fn invalidate(&self) {
        self.store(None);
    }

    fn fresh(&self, now: Instant) -> Option<Arc<Workbook>> {
        let slot = match self.slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref()
            .filter(|cached| now.saturating_duration_since(cached.fetched_at) < self.ttl)
            .map(|cached| Arc::clone(&cached.workbook))
    }

    fn store(&self, entry: Option<CachedWorkbook>) {
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = entry;
    }

    async fn refresh(&self) -> Result<Workbook> {
        let bytes = self.fetcher.fetch(&self.url).await?;
        parse_workbook(&bytes)
    }
}
