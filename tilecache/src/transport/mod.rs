//! Image transport abstraction.
//!
//! The cache never talks to the network directly; it asks a [`TileTransport`]
//! to fetch the raw bytes behind a tile key. The transport resolves exactly
//! once per call and is not expected to retry.

mod http;

pub use http::{HttpTransport, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

#[cfg(test)]
pub use self::tests::MockTransport;

use bytes::Bytes;
use thiserror::Error;

use crate::cache::BoxFuture;

/// Errors returned by a transport.
///
/// `Clone` so a single result can be broadcast to coalesced waiters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Response body is unusable (e.g. empty).
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request driving a coalesced fetch went away before finishing.
    #[error("Fetch was interrupted before completing")]
    Interrupted,
}

/// Fetches raw image bytes for a tile key.
///
/// Implementations must be `Send + Sync` so a single transport can be shared
/// by the engine and the seed driver.
pub trait TileTransport: Send + Sync {
    /// Fetches the bytes behind `key`.
    fn fetch(&self, key: &str) -> BoxFuture<'_, Result<Bytes, TransportError>>;

    /// Name for logging.
    fn name(&self) -> &str {
        "transport"
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    /// Scriptable transport for tests.
    ///
    /// Returns `default` for every key unless an override is set, and counts
    /// every call.
    pub struct MockTransport {
        default: Mutex<Result<Bytes, TransportError>>,
        overrides: Mutex<HashMap<String, Result<Bytes, TransportError>>>,
        delay: Mutex<Option<Duration>>,
        calls: AtomicUsize,
        keys: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn ok(data: impl Into<Bytes>) -> Self {
            Self::with_result(Ok(data.into()))
        }

        pub fn failing() -> Self {
            Self::with_result(Err(TransportError::Http("connection refused".to_string())))
        }

        fn with_result(result: Result<Bytes, TransportError>) -> Self {
            Self {
                default: Mutex::new(result),
                overrides: Mutex::new(HashMap::new()),
                delay: Mutex::new(None),
                calls: AtomicUsize::new(0),
                keys: Mutex::new(Vec::new()),
            }
        }

        pub fn set_ok(&self, data: impl Into<Bytes>) {
            *self.default.lock() = Ok(data.into());
        }

        pub fn set_failing(&self) {
            *self.default.lock() = Err(TransportError::Http("connection refused".to_string()));
        }

        pub fn fail_key(&self, key: &str) {
            self.overrides.lock().insert(
                key.to_string(),
                Err(TransportError::Status {
                    status: 404,
                    url: key.to_string(),
                }),
            );
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn fetched_keys(&self) -> Vec<String> {
            self.keys.lock().clone()
        }
    }

    impl TileTransport for MockTransport {
        fn fetch(&self, key: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
            let key = key.to_string();
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.keys.lock().push(key.clone());

                let delay = *self.delay.lock();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                if let Some(result) = self.overrides.lock().get(&key) {
                    return result.clone();
                }
                self.default.lock().clone()
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_mock_transport_counts_calls() {
        let transport = MockTransport::ok(vec![1, 2, 3]);

        let data = transport.fetch("a").await.unwrap();
        assert_eq!(&data[..], &[1, 2, 3]);
        assert_eq!(transport.calls(), 1);

        transport.set_failing();
        assert!(transport.fetch("a").await.is_err());
        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.fetched_keys(), vec!["a", "a"]);
    }

    #[tokio::test]
    async fn test_mock_transport_key_override() {
        let transport = MockTransport::ok(vec![1]);
        transport.fail_key("bad");

        assert!(transport.fetch("good").await.is_ok());
        assert!(matches!(
            transport.fetch("bad").await,
            Err(TransportError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Status {
            status: 503,
            url: "http://x/1/2/3.png".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from http://x/1/2/3.png");
        assert_eq!(
            TransportError::Interrupted.to_string(),
            "Fetch was interrupted before completing"
        );
    }
}
