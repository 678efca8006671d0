//! HTTP transport using reqwest.

use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use super::{TileTransport, TransportError};
use crate::cache::BoxFuture;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every tile request.
///
/// Public tile servers (OpenStreetMap in particular) reject requests without
/// an identifying user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("tilecache/", env!("CARGO_PKG_VERSION"));

/// Async HTTP transport.
///
/// Uses non-blocking I/O, so fetches never tie up runtime threads.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a transport with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn map_send_error(url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(url.to_string())
        } else {
            TransportError::Http(format!("Request failed: {}", e))
        }
    }
}

impl TileTransport for HttpTransport {
    fn fetch(&self, key: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        let url = key.to_string();
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| Self::map_send_error(&url, e))?;

            // Check HTTP status
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    url,
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| Self::map_send_error(&url, e))?;

            if body.is_empty() {
                return Err(TransportError::InvalidResponse(format!(
                    "Empty body from {}",
                    url
                )));
            }

            trace!(url = %url, bytes = body.len(), "Tile fetched");
            Ok(body)
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
