//! Bearer token and cached profile persistence.
//!
//! The store is purely local state with a well-defined lifecycle:
//! populated after a successful login or 2FA verification, read on every
//! outgoing request, and cleared on logout or on an authoritative 401
//! from a non-login endpoint.

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::warn;

use royal_burger_core::UserId;

use crate::storage::KeyValueStore;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "rb.token";

/// Storage key holding the JSON-serialized user profile.
pub const USER_KEY: &str = "rb.user";

/// Cached profile of the authenticated user.
///
/// Only the fields the client renders are modeled; everything else the
/// backend returns is dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user id.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Account email.
    #[serde(default)]
    pub email: Option<String>,
    /// Backend role tag (`customer`, `attendant`, `admin`).
    #[serde(default)]
    pub role: Option<String>,
}

/// Local store for the bearer token and the cached user profile.
///
/// The token is an opaque string issued by the backend; no validation of
/// its internal structure is performed client-side. Storage write
/// failures are logged and never propagate, so a full disk cannot break
/// an in-flight login.
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Create a store over the given durable storage.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The stored bearer token, if present and non-empty.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.storage
            .get(TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
    }

    /// Whether a bearer token is currently stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Store the bearer token. An empty token is ignored.
    pub fn set_token(&self, token: &str) {
        if token.is_empty() {
            warn!("ignoring empty bearer token");
            return;
        }
        if let Err(e) = self.storage.set(TOKEN_KEY, token) {
            warn!(error = %e, "failed to persist bearer token");
        }
    }

    /// Remove the stored bearer token.
    pub fn clear_token(&self) {
        self.storage.remove(TOKEN_KEY);
    }

    /// The cached user profile, if present and well-formed.
    ///
    /// Malformed stored JSON reads as `None` rather than failing.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "discarding malformed cached profile");
                None
            }
        }
    }

    /// Cache the user profile.
    pub fn set_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(USER_KEY, &raw) {
                    warn!(error = %e, "failed to persist user profile");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize user profile"),
        }
    }

    /// Remove the cached user profile.
    pub fn clear_user(&self) {
        self.storage.remove(USER_KEY);
    }

    /// Clear both the token and the cached profile.
    ///
    /// Called on logout and on an authoritative 401 from a non-login
    /// endpoint.
    pub fn logout_local(&self) {
        self.clear_token();
        self.clear_user();
    }
}
