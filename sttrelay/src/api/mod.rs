//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - `POST /transcribe`: forward one uploaded audio file to the speech-to-text provider
//! - `GET /healthz`: liveness check
//! - `GET /openapi.json`, `/docs`: OpenAPI document and Scalar UI

pub mod handlers;
pub mod models;
