//! Core types for the Royal Burger client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod limits;

pub use id::*;
pub use limits::*;
