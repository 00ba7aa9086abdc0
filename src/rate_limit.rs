use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

/// Per-client counter for the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub count: u32,
    // Epoch millis marking the end of this client's window
    #[serde(rename = "resetTime")]
    pub reset_time: i64,
}

/// Full snapshot of all client counters, keyed by client IP string.
/// Stale records are never pruned; they stay until overwritten.
pub type RateLimitTable = HashMap<String, RateLimitRecord>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access rate limit store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rate limit store: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persistence seam for the rate limit table. Production uses a flat
/// JSON file; tests inject an in-memory map or forced failures.
pub trait RateLimitStore: Send + Sync {
    fn load(&self) -> Result<RateLimitTable, StoreError>;
    fn save(&self, table: &RateLimitTable) -> Result<(), StoreError>;
}

/// Whole-file JSON snapshot store. Every cycle reads the full table and
/// rewrites it.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RateLimitStore for FileStore {
    fn load(&self) -> Result<RateLimitTable, StoreError> {
        // No file yet just means no client has been counted
        if !self.path.exists() {
            return Ok(RateLimitTable::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, table: &RateLimitTable) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(table)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Time source seam so tests can drive window expiry.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time in epoch millis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited,
}

/// Rate limiting gate: max `max_requests` per client per window, with
/// each client's window anchored to its own first request.
///
/// Storage errors fail open in both directions: an unreadable store is
/// treated as empty, and a failed write is logged and skipped.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    max_requests: u32,
    window_millis: i64,
    // Serializes the read-modify-write cycle against the store
    cycle: Mutex<()>,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
        max_requests: u32,
        window: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            max_requests,
            window_millis: window.as_millis() as i64,
            cycle: Mutex::new(()),
        }
    }

    /// Run one read-modify-write cycle for `client` and decide whether
    /// the request may proceed. A rejection leaves the stored record
    /// untouched: no increment, no fresh reset time, no write.
    pub async fn check(&self, client: &str) -> Decision {
        let _guard = self.cycle.lock().await;
        let now = self.clock.now_millis();

        let mut table = match self.store.load() {
            Ok(table) => table,
            Err(e) => {
                warn!("error reading rate limit store, treating as empty: {e}");
                RateLimitTable::new()
            }
        };

        match table.get_mut(client) {
            Some(record) if now < record.reset_time => {
                if record.count >= self.max_requests {
                    return Decision::Limited;
                }
                record.count += 1;
            }
            _ => {
                // First request, or the previous window has expired
                table.insert(
                    client.to_string(),
                    RateLimitRecord {
                        count: 1,
                        reset_time: now + self.window_millis,
                    },
                );
            }
        }

        if let Err(e) = self.store.save(&table) {
            warn!("error writing rate limit store: {e}");
        }
        Decision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    const DAY_MILLIS: i64 = 86_400_000;

    struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        fn new(millis: i64) -> Self {
            Self {
                millis: AtomicI64::new(millis),
            }
        }

        fn advance(&self, millis: i64) {
            self.millis.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        table: StdMutex<RateLimitTable>,
        saves: AtomicUsize,
    }

    impl MemoryStore {
        fn snapshot(&self) -> RateLimitTable {
            self.table.lock().unwrap().clone()
        }
    }

    impl RateLimitStore for MemoryStore {
        fn load(&self) -> Result<RateLimitTable, StoreError> {
            Ok(self.table.lock().unwrap().clone())
        }

        fn save(&self, table: &RateLimitTable) -> Result<(), StoreError> {
            *self.table.lock().unwrap() = table.clone();
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingStore;

    impl RateLimitStore for FailingStore {
        fn load(&self) -> Result<RateLimitTable, StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn save(&self, _table: &RateLimitTable) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    fn limiter_with(
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
        max_requests: u32,
    ) -> RateLimiter {
        RateLimiter::new(store, clock, max_requests, Duration::from_secs(86400))
    }

    #[tokio::test]
    async fn first_request_creates_a_fresh_record() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(1_000));
        let limiter = limiter_with(store.clone(), clock, 100);

        assert_eq!(limiter.check("1.2.3.4").await, Decision::Allowed);

        let record = store.snapshot().get("1.2.3.4").cloned().unwrap();
        assert_eq!(
            record,
            RateLimitRecord {
                count: 1,
                reset_time: 1_000 + DAY_MILLIS,
            }
        );
    }

    #[tokio::test]
    async fn requests_under_the_limit_are_allowed() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(store.clone(), clock, 100);

        for _ in 0..100 {
            assert_eq!(limiter.check("1.2.3.4").await, Decision::Allowed);
        }
        assert_eq!(store.snapshot()["1.2.3.4"].count, 100);
    }

    #[tokio::test]
    async fn request_over_the_limit_is_rejected_without_a_write() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(store.clone(), clock, 100);

        for _ in 0..100 {
            limiter.check("1.2.3.4").await;
        }
        let saves_before = store.saves.load(Ordering::SeqCst);
        let record_before = store.snapshot()["1.2.3.4"].clone();

        assert_eq!(limiter.check("1.2.3.4").await, Decision::Limited);

        // Rejection must not bump the count, extend the window, or persist
        assert_eq!(store.saves.load(Ordering::SeqCst), saves_before);
        assert_eq!(store.snapshot()["1.2.3.4"], record_before);
    }

    #[tokio::test]
    async fn expired_window_resets_the_counter() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(store.clone(), clock.clone(), 2);

        limiter.check("1.2.3.4").await;
        limiter.check("1.2.3.4").await;
        assert_eq!(limiter.check("1.2.3.4").await, Decision::Limited);

        clock.advance(DAY_MILLIS);
        assert_eq!(limiter.check("1.2.3.4").await, Decision::Allowed);

        let record = store.snapshot().get("1.2.3.4").cloned().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.reset_time, 2 * DAY_MILLIS);
    }

    #[tokio::test]
    async fn clients_are_counted_independently() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(store, clock, 1);

        assert_eq!(limiter.check("1.2.3.4").await, Decision::Allowed);
        assert_eq!(limiter.check("1.2.3.4").await, Decision::Limited);
        assert_eq!(limiter.check("5.6.7.8").await, Decision::Allowed);
    }

    #[tokio::test]
    async fn storage_failures_fail_open() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(Arc::new(FailingStore), clock, 100);

        // Neither the unreadable load nor the failed save blocks the request
        assert_eq!(limiter.check("1.2.3.4").await, Decision::Allowed);
        assert_eq!(limiter.check("1.2.3.4").await, Decision::Allowed);
    }

    #[test]
    fn file_store_missing_file_is_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("counters.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_round_trips_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("counters.json"));

        let mut table = RateLimitTable::new();
        table.insert(
            "1.2.3.4".to_string(),
            RateLimitRecord {
                count: 7,
                reset_time: 123_456,
            },
        );
        store.save(&table).unwrap();
        assert_eq!(store.load().unwrap(), table);
    }

    #[test]
    fn file_store_uses_the_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let store = FileStore::new(&path);

        let mut table = RateLimitTable::new();
        table.insert(
            "1.2.3.4".to_string(),
            RateLimitRecord {
                count: 1,
                reset_time: 99,
            },
        );
        store.save(&table).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["1.2.3.4"]["count"], 1);
        assert_eq!(raw["1.2.3.4"]["resetTime"], 99);
    }

    #[test]
    fn file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        std::fs::write(&path, "{{{").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Parse(_))));
    }
}
