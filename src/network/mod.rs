//! HTTP networking module
//!
//! Provides the reqwest-backed transport for the backend proxy.

mod client;

pub use client::HttpClient;
