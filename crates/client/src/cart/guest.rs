//! Anonymous cart identity persistence.
//!
//! While the user is unauthenticated, the server-issued cart id and a
//! denormalized snapshot of its items live under a single storage key.
//! This store is the persistence boundary between sessions for guest
//! carts; it is written after every successful guest mutation and
//! cleared on claim, sync, or stale-identifier detection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::storage::KeyValueStore;

/// Storage key holding the guest cart snapshot.
pub const GUEST_CART_KEY: &str = "royal_burger_cart";

/// Prefix of identifiers from a deprecated client-allocated scheme.
/// These are purged on sight.
const FALLBACK_PREFIX: &str = "fallback_";

/// Persisted guest cart snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestCartSnapshot {
    /// Server-assigned cart identifier.
    #[serde(rename = "cartId")]
    pub cart_id: String,
    /// Denormalized items as echoed by the server.
    pub items: Vec<Value>,
    /// Write time, milliseconds since the epoch.
    pub timestamp: i64,
}

/// Store for the guest cart identifier and item snapshot.
pub struct GuestCartStore {
    storage: Arc<dyn KeyValueStore>,
}

impl GuestCartStore {
    /// Create a store over the given durable storage.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The stored cart identifier, normalized.
    ///
    /// Returns `None` for anything that fails validation: empty strings,
    /// the literals `"null"`/`"undefined"`, non-numeric values.
    /// Identifiers from the deprecated fallback scheme are also actively
    /// purged from storage when seen.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        let snapshot = self.snapshot()?;
        if snapshot.cart_id.starts_with(FALLBACK_PREFIX) {
            warn!("purging deprecated fallback cart identifier");
            self.clear();
            return None;
        }
        normalize_cart_id(&snapshot.cart_id)
    }

    /// The stored item snapshot, if the identifier is still valid.
    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        match self.snapshot() {
            Some(snapshot) if normalize_cart_id(&snapshot.cart_id).is_some() => snapshot.items,
            _ => Vec::new(),
        }
    }

    /// The raw stored document, bypassing normalization.
    ///
    /// Sync reads this so that a snapshot predating the current
    /// validation rules can still be submitted.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.storage.get(GUEST_CART_KEY)
    }

    /// Persist the identifier and item snapshot.
    ///
    /// A malformed identifier is rejected without touching prior state;
    /// storage failures (quota) are logged, never thrown.
    pub fn save(&self, cart_id: &str, items: &[Value]) {
        let Some(cart_id) = normalize_cart_id(cart_id) else {
            warn!(cart_id, "rejecting malformed guest cart identifier");
            return;
        };
        let snapshot = GuestCartSnapshot {
            cart_id,
            items: items.to_vec(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(GUEST_CART_KEY, &raw) {
                    warn!(error = %e, "failed to persist guest cart snapshot");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize guest cart snapshot"),
        }
    }

    /// Remove the stored snapshot.
    pub fn clear(&self) {
        self.storage.remove(GUEST_CART_KEY);
    }

    fn snapshot(&self) -> Option<GuestCartSnapshot> {
        let raw = self.storage.get(GUEST_CART_KEY)?;
        serde_json::from_str(&raw).ok()
    }
}

/// Normalize a cart identifier to a non-empty decimal-digit string.
///
/// The identifier is a server-assigned surrogate key; any other shape is
/// treated as absent.
#[must_use]
pub fn normalize_cart_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed == "null"
        || trimmed == "undefined"
        || !trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some(trimmed.to_string())
}
