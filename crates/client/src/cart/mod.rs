//! Hybrid cart: guest identity, validation, and reconciliation.
//!
//! # Architecture
//!
//! - [`guest`] - persisted guest cart identifier + item snapshot
//! - [`validator`] - cached existence checks for stored identifiers
//! - [`types`] - input validation and the wire/read models
//! - [`envelope`] - accessors for the server's response shapes
//! - [`service`] - the orchestrator branching on authentication state
//!
//! A guest's cart lives server-side under a numeric identifier persisted
//! locally; an authenticated user's cart is addressed as "my cart". The
//! service re-derives which identity owns the cart on every call and
//! repairs stale guest identifiers along the way.

pub mod envelope;
pub mod guest;
pub mod service;
pub mod types;
pub mod validator;

pub use guest::{GuestCartSnapshot, GuestCartStore};
pub use service::{
    CartErrorCode, CartFailure, CartMutation, CartOutcome, CartService,
};
pub use types::{
    AddItemInput, BaseModificationInput, Cart, CartInputError, CartItem, ExtraInput,
    UpdateItemInput,
};
pub use validator::GuestCartValidator;
