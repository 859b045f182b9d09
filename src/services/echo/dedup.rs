use std::sync::Mutex;
use std::time::{Duration, Instant};
use std::{future::Future, pin::Pin};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::services::cache::CacheError;

/// Admission check result:
/// - `Ok(true)`: first time this key is seen (now recorded)
/// - `Ok(false)`: seen before
/// - `Err(_)`: backend failure
pub trait ReplicationDedup: Send + Sync {
    // Atomically test-and-record `key`. Concurrent first arrivals admit exactly one caller.
    fn admit_once<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, DedupError>> + Send + 'a>>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

// upper bound between two sweeps of expired keys
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Process-local set. Keys expire after `ttl`, like the Valkey backend.
#[derive(Debug)]
pub struct MemoryDedup {
    // key → expiry
    seen: DashMap<String, Instant>,
    ttl: Duration,
    last_sweep: Mutex<Instant>,
}

impl MemoryDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn admit_at(&self, key: &str, now: Instant) -> bool {
        // the entry holds the shard lock: only one racer sees a vacant or expired slot
        let admitted = match self.seen.entry(key.to_string()) {
            Entry::Occupied(mut entry) if *entry.get() <= now => {
                entry.insert(now + self.ttl);
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(now + self.ttl);
                true
            }
        };
        self.sweep_if_due(now);
        admitted
    }

    fn sweep_if_due(&self, now: Instant) {
        let due = match self.last_sweep.try_lock() {
            Ok(mut last) if now.saturating_duration_since(*last) >= self.ttl.min(SWEEP_INTERVAL) => {
                *last = now;
                true
            }
            _ => false,
        };
        if due {
            self.seen.retain(|_, expires| *expires > now);
        }
    }
}

impl ReplicationDedup for MemoryDedup {
    fn admit_once<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, DedupError>> + Send + 'a>> {
        let admitted = self.admit_at(key, Instant::now());
        Box::pin(async move { Ok(admitted) })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
