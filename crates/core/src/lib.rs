//! Royal Burger Core - Shared types library.
//!
//! This crate provides common types used across the Royal Burger client
//! components:
//! - `client` - Storefront client library (cart, auth, API gateway)
//! - `integration-tests` - End-to-end tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types and constants - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and domain limits

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
