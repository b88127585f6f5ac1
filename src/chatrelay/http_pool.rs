//! Shared HTTP client for all backend traffic.
//!
//! A single `reqwest::Client` is lazily initialized and reused across
//! completion requests and model listing so that HTTP connections, DNS
//! lookups, and TLS handshakes are pooled per host.
//!
//! No overall request timeout is configured here: streaming completions can
//! legitimately run for minutes, and timeout policy belongs to the caller's
//! transport configuration, not the core.

use std::time::Duration;

use lazy_static::lazy_static;

lazy_static! {
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        // Keep idle connections alive so consecutive completion turns reuse them.
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");
}

/// Get the process-wide pooled HTTP client.
pub fn get_shared_http_client() -> reqwest::Client {
    SHARED_HTTP_CLIENT.clone()
}
