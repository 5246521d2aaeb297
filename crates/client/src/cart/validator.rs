//! Guest cart existence checks with a bounded, time-expiring cache.
//!
//! Mutating operations ask "does this guest cart still exist
//! server-side" before attaching an identifier. The answer is cached for
//! a short TTL so bursts of cart edits cost one existence check, not
//! one per edit. Inconclusive failures (timeout, network) are treated as
//! invalid without clearing the store, since they are not authoritative.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, RequestOptions};

use super::guest::{GuestCartStore, normalize_cart_id};

/// How long a cached verdict stays fresh.
pub const VALIDATION_TTL: Duration = Duration::from_secs(30);

/// Upper bound on cached verdicts.
pub const VALIDATION_CACHE_MAX_SIZE: usize = 100;

/// Timeout for the existence check itself.
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    is_valid: bool,
    written_at: Instant,
}

/// Bounded map of identifier -> verdict with TTL expiry.
///
/// Before each lookup, expired entries are purged; if the map still
/// exceeds its capacity, the oldest entries by write time are evicted
/// until back under the limit. The same bound is re-enforced after
/// every insert, so size never exceeds the maximum after any write.
#[derive(Debug)]
pub(crate) struct ValidationCache {
    entries: HashMap<String, CacheEntry>,
    max_size: usize,
    ttl: Duration,
}

impl ValidationCache {
    pub(crate) fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            ttl,
        }
    }

    pub(crate) fn lookup(&mut self, cart_id: &str) -> Option<bool> {
        self.maintain();
        self.entries.get(cart_id).map(|entry| entry.is_valid)
    }

    pub(crate) fn insert(&mut self, cart_id: &str, is_valid: bool) {
        self.entries.insert(
            cart_id.to_string(),
            CacheEntry {
                is_valid,
                written_at: Instant::now(),
            },
        );
        self.evict_to_bound();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn maintain(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.written_at.elapsed() < ttl);
        self.evict_to_bound();
    }

    fn evict_to_bound(&mut self) {
        while self.entries.len() > self.max_size {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.written_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

/// Validator for stored guest cart identifiers.
pub struct GuestCartValidator {
    api: ApiClient,
    store: Arc<GuestCartStore>,
    cache: Mutex<ValidationCache>,
}

impl GuestCartValidator {
    /// Create a validator over the gateway and the guest cart store.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<GuestCartStore>) -> Self {
        Self {
            api,
            store,
            cache: Mutex::new(ValidationCache::new(
                VALIDATION_CACHE_MAX_SIZE,
                VALIDATION_TTL,
            )),
        }
    }

    /// Whether the guest cart identifier still names a cart server-side.
    ///
    /// A non-numeric identifier can only be corruption: it is rejected
    /// immediately and the store is cleared. A 404/400 from the server is
    /// authoritative (invalid, store cleared); any other failure is
    /// fail-closed invalid without clearing the store.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn is_valid(&self, cart_id: &str) -> bool {
        if normalize_cart_id(cart_id).is_none() {
            warn!("non-numeric guest cart identifier; clearing store");
            self.store.clear();
            return false;
        }

        if let Some(cached) = self.lock_cache().lookup(cart_id) {
            debug!(cached, "guest cart validation cache hit");
            return cached;
        }

        let verdict = match self
            .api
            .request(
                &format!("/api/cart/guest/{cart_id}"),
                RequestOptions {
                    skip_retry: true,
                    timeout: Some(VALIDATION_TIMEOUT),
                    ..RequestOptions::default()
                },
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                match e.status().map(|s| s.as_u16()) {
                    Some(400 | 404) => {
                        debug!("guest cart no longer exists; clearing store");
                        self.store.clear();
                    }
                    _ => {
                        // Inconclusive: fail closed, keep the identifier
                        warn!(error = %e, "guest cart existence check inconclusive");
                    }
                }
                false
            }
        };

        let mut cache = self.lock_cache();
        cache.insert(cart_id, verdict);
        debug!(verdict, entries = cache.len(), "guest cart verdict cached");
        verdict
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ValidationCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
