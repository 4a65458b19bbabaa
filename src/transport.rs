//! Transport for fetching the segment list and data segments
//!
//! A transport performs exactly one GET per call and hands back the response
//! body as a blocking byte stream. It never retries: failures propagate to the
//! caller, which may resume later from its last reported position.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use crate::config::DEFAULT_USER_AGENT;

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Readable response body
pub type ByteStream = Box<dyn Read + Send>;

/// Performs one GET per call and returns the body as a stream
pub trait Transport: Send + Sync {
    /// Open a stream over the resource at `url`
    fn get(&self, url: &str) -> Result<ByteStream, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, url: &str) -> Result<ByteStream, TransportError> {
        (**self).get(url)
    }
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent string
    pub user_agent: String,
    /// Whole-request timeout. `None` lets a segment download run as long as it needs.
    pub timeout: Option<Duration>,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
        }
    }
}

/// Blocking HTTP transport backed by reqwest
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        // Bodies are handed over still compressed; decompression belongs to the caller
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .no_gzip()
            .build()?;

        Ok(Self { client, config })
    }

    /// Get configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<ByteStream, TransportError> {
        let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        tracing::debug!("GET {}", url);
        let response = self.client.get(parsed).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(response))
    }
}

/// In-memory transport serving fixed bodies by URL.
///
/// Every requested URL is recorded, which makes it possible to assert on the
/// exact fetch order of a run.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    bodies: HashMap<String, Arc<Vec<u8>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), Arc::new(body.into()));
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Transport for MemoryTransport {
    fn get(&self, url: &str) -> Result<ByteStream, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| TransportError::NotFound(url.to_string()))?;
        Ok(Box::new(Cursor::new(body.as_ref().clone())))
    }
}

/// Transport wrapper counting response bodies that are still alive
#[cfg(test)]
pub(crate) struct TrackingTransport<T> {
    inner: T,
    open: Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl<T: Transport> TrackingTransport<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            open: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    pub(crate) fn open_streams(&self) -> usize {
        self.open.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
struct TrackedStream {
    inner: ByteStream,
    open: Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.open.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl<T: Transport> Transport for TrackingTransport<T> {
    fn get(&self, url: &str) -> Result<ByteStream, TransportError> {
        let inner = self.inner.get(url)?;
        self.open.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(Box::new(TrackedStream {
            inner,
            open: self.open.clone(),
        }))
    }
}
