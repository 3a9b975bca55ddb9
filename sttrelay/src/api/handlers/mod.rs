//! HTTP request handlers.
//!
//! - [`transcriptions`]: the relay endpoint
//! - [`health`]: liveness check
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to the provider's status (upstream
//! failures) or 500 (everything else), with a `{"detail": ...}` body.

pub mod health;
pub mod transcriptions;
