//! API request and response data models.
//!
//! - [`transcriptions`]: the upload handed to the provider and the error envelope returned on failure
//! - [`health`]: liveness check payload

pub mod health;
pub mod transcriptions;
