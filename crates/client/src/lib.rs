//! Royal Burger storefront client library.
//!
//! Talks to the Royal Burger ordering API on behalf of an embedding
//! application: authentication session state, a resilient HTTP gateway
//! with retry and error classification, and a shopping cart that
//! reconciles between an anonymous guest identity and an authenticated
//! user identity.
//!
//! # Architecture
//!
//! - [`config`] - environment-driven configuration
//! - [`storage`] - durable key-value seam under the stores
//! - [`api`] - error taxonomy, retry engine, request gateway
//! - [`auth`] - credential store and session service
//! - [`cart`] - guest cart store, validator, reconciliation service
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use royal_burger_client::RoyalBurgerClient;
//! use royal_burger_client::cart::AddItemInput;
//! use royal_burger_client::config::ClientConfig;
//! use royal_burger_client::storage::FileStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let client = RoyalBurgerClient::new(&config, Arc::new(FileStore::open("state.json")));
//!
//! // Works for guests and authenticated users alike
//! let outcome = client.cart.add_item(AddItemInput::new(5, 2)).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod storage;

use std::sync::Arc;

use api::ApiClient;
use api::retry::RetryPolicy;
use auth::{AuthService, CredentialStore};
use cart::{CartService, GuestCartStore, GuestCartValidator};
use config::ClientConfig;
use storage::KeyValueStore;

/// Composition root wiring the stores and services together.
///
/// The stores are single-instance-per-process by construction here, not
/// by ambient global state; tests build their own instances over fresh
/// storage.
pub struct RoyalBurgerClient {
    /// Authentication session service.
    pub auth: AuthService,
    /// Cart reconciliation service.
    pub cart: CartService,
    /// The underlying gateway, for callers with bespoke endpoints.
    pub api: ApiClient,
}

impl RoyalBurgerClient {
    /// Assemble the client over the given durable storage.
    #[must_use]
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let credentials = Arc::new(CredentialStore::new(Arc::clone(&storage)));
        let api = ApiClient::new(config, Arc::clone(&credentials));
        Self::assemble(storage, credentials, api)
    }

    /// Assemble the client with an explicit retry policy.
    #[must_use]
    pub fn with_policy(
        config: &ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        retry: RetryPolicy,
    ) -> Self {
        let credentials = Arc::new(CredentialStore::new(Arc::clone(&storage)));
        let api = ApiClient::with_policy(config, Arc::clone(&credentials), retry);
        Self::assemble(storage, credentials, api)
    }

    fn assemble(
        storage: Arc<dyn KeyValueStore>,
        credentials: Arc<CredentialStore>,
        api: ApiClient,
    ) -> Self {
        let guest = Arc::new(GuestCartStore::new(storage));
        let validator = GuestCartValidator::new(api.clone(), Arc::clone(&guest));
        let cart = CartService::new(
            api.clone(),
            Arc::clone(&credentials),
            guest,
            validator,
        );
        let auth = AuthService::new(api.clone(), credentials);
        Self { auth, cart, api }
    }
}
