//! Authentication state and session flow.
//!
//! [`CredentialStore`] is the durable token/profile state read on every
//! outgoing request; [`AuthService`] drives its lifecycle through the
//! login, 2FA, and logout endpoints.

pub mod credentials;
pub mod service;

pub use credentials::{CredentialStore, UserProfile};
pub use service::{AuthError, AuthService, LoginOutcome, LogoutOutcome};
