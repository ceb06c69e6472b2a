//! HTTP API access.
//!
//! This module provides the reqwest-backed client and the endpoint routes
//! for both API deployments.

pub mod client;
pub mod routes;

pub use client::{ApiClient, FetchError};
pub use routes::{ApiVariant, Routes};
