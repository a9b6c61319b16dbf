//! HTTP transport.
//!
//! This module provides the reqwest based API client.

mod client;

pub use client::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, HttpClient, HttpClientBuilder};
