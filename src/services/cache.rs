// src/services/cache.rs
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

/// Time-boxed memoization keyed by string.
///
/// Values are cloned out, so `V` is usually an `Arc`. Failed computations
/// are not stored.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    clock: Clock,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        TtlCache {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the fresh value stored under `key`, or runs `compute` and
    /// stores its result for `ttl`.
    ///
    /// The lock is held while computing, so concurrent callers for an
    /// expired entry wait for one computation instead of racing.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut entries = self.entries.lock().await;
        let now = (self.clock)();

        if let Some(entry) = entries.get(key) {
            if now - entry.stored_at < entry.ttl {
                debug!("Cache hit for '{}'", key);
                return Ok(entry.value.clone());
            }
            debug!("Cache entry '{}' expired", key);
        } else {
            debug!("Cache miss for '{}'", key);
        }

        let value = compute().await?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                stored_at: now,
                ttl,
            },
        );
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) {
        if self.entries.lock().await.remove(key).is_some() {
            debug!("Invalidated cache entry '{}'", key);
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        debug!("Cache cleared");
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    fn manual_clock() -> (Clock, Arc<AtomicI64>) {
        let seconds = Arc::new(AtomicI64::new(1_700_000_000));
        let handle = seconds.clone();
        let clock: Clock = Arc::new(move || {
            DateTime::from_timestamp(handle.load(Ordering::SeqCst), 0).unwrap_or_default()
        });
        (clock, seconds)
    }

    #[tokio::test]
    async fn reuses_value_until_ttl_elapses() {
        let (clock, seconds) = manual_clock();
        let cache: TtlCache<usize> = TtlCache::with_clock(clock);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let ttl = Duration::seconds(300);

        let load = move || async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst) + 1) };

        assert_eq!(cache.get_or_compute("rows", ttl, load).await, Ok(1));
        seconds.fetch_add(299, Ordering::SeqCst);
        assert_eq!(cache.get_or_compute("rows", ttl, load).await, Ok(1));
        seconds.fetch_add(1, Ordering::SeqCst);
        assert_eq!(cache.get_or_compute("rows", ttl, load).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_recompute() {
        let cache: TtlCache<&'static str> = TtlCache::new();
        let ttl = Duration::minutes(5);

        let first = cache.get_or_compute("k", ttl, || async { Ok::<_, ()>("old") }).await;
        assert_eq!(first, Ok("old"));

        cache.invalidate("k").await;
        let second = cache.get_or_compute("k", ttl, || async { Ok::<_, ()>("new") }).await;
        assert_eq!(second, Ok("new"));

        cache.clear().await;
        let third = cache.get_or_compute("k", ttl, || async { Ok::<_, ()>("newer") }).await;
        assert_eq!(third, Ok("newer"));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new();
        let ttl = Duration::minutes(5);

        let failed = cache.get_or_compute("k", ttl, || async { Err::<u32, _>("offline") }).await;
        assert_eq!(failed, Err("offline"));

        let ok = cache.get_or_compute("k", ttl, || async { Ok::<_, &str>(7) }).await;
        assert_eq!(ok, Ok(7));
    }
}
