//! # maxbot transport
//!
//! Network implementations of the [`PlatformClient`](maxbot_core::PlatformClient)
//! seam defined in `maxbot-core`.
//!
//! ## Features
//!
//! - `http-client` (default): [`HttpClient`], a reqwest client for the REST API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  maxbot-runtime     │  (polling loop, webhook decoding)
//! ├─────────────────────┤
//! │  maxbot-core        │  (PlatformClient trait)
//! ├─────────────────────┤
//! │  maxbot-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTPS)    │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxbot_transport::HttpClient;
//!
//! let client = HttpClient::builder("TOKEN").build()?;
//! let page = client.get_updates(&UpdatesRequest::default()).await?;
//! ```

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, HttpClient, HttpClientBuilder};
