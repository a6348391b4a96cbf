//! HTTP client abstraction used by the collector.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;
