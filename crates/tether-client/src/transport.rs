//! HTTP exchange with the automation server.
//!
//! [`Transport`] is the seam between the protocol layer and the network.
//! [`HttpTransport`] wraps a pooled blocking `reqwest` client; one instance
//! is meant to be built at startup and shared by every session through an
//! `Arc`.

use std::sync::{Arc, OnceLock};

use reqwest::header::{ALLOW, CONTENT_TYPE};
use tether_core::error::TwinError;
use tether_core::protocol::{Method, JSON_CONTENT_TYPE};
use tracing::debug;

use crate::config::PoolConfig;

/// A request ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Encoded JSON body. Any method may carry one, GET included.
    pub body: Option<String>,
}

/// The parts of a response the protocol looks at.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub allow: Option<String>,
    pub body: String,
}

/// Sends one request and blocks until the response is complete.
///
/// Implementations must not retry.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TwinError>;
}

/// Pooled HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(pool: &PoolConfig) -> Result<Self, TwinError> {
        let client = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .timeout(pool.request_timeout)
            .build()
            .map_err(|e| TwinError::transport("failed to build HTTP client", e))?;
        Ok(Self { client })
    }

    /// A process-wide transport with default pool settings.
    ///
    /// Threads racing on first use may each build a client; one is kept.
    pub fn shared() -> Result<Arc<HttpTransport>, TwinError> {
        static SHARED: OnceLock<Arc<HttpTransport>> = OnceLock::new();
        if let Some(existing) = SHARED.get() {
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(HttpTransport::new(&PoolConfig::default())?);
        let _ = SHARED.set(Arc::clone(&built));
        Ok(SHARED.get().map_or(built, Arc::clone))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TwinError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body.clone());
        }
        let response = builder.send().map_err(|e| {
            TwinError::transport(format!("{} {} failed", request.method, request.url), e)
        })?;

        let status = response.status().as_u16();
        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let allow = header(ALLOW);
        let body = response.text().map_err(|e| {
            TwinError::transport(
                format!("failed to read response to {} {}", request.method, request.url),
                e,
            )
        })?;
        debug!("{} {} -> {}", request.method, request.url, status);
        Ok(HttpResponse {
            status,
            content_type,
            allow,
            body,
        })
    }
}
