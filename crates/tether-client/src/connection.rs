//! Request/response exchange with one automation server.

use std::panic::Location;
use std::sync::Arc;

use tether_core::error::{ErrorCode, TwinError};
use tether_core::exception::RemoteError;
use tether_core::json::{self, Recognizer, Value};
use tether_core::protocol::{self, Envelope, Method};
use tracing::{debug, warn};

use crate::transport::{HttpRequest, HttpResponse, Transport};

/// A connection to a server endpoint.
///
/// Cloning shares the underlying transport.
#[derive(Clone)]
pub struct Connection {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// `url` is the server endpoint; a trailing `/` is dropped.
    pub fn new(transport: Arc<dyn Transport>, url: &str) -> Self {
        Self {
            base_url: url.strip_suffix('/').unwrap_or(url).to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Allowed methods for `path`, from the `Allow` header.
    pub fn options(&self, path: &str) -> Result<Vec<String>, TwinError> {
        let request = HttpRequest {
            method: Method::Options,
            url: format!("{}{}", self.base_url, path),
            body: None,
        };
        debug!("Sending OPTIONS {}", request.url);
        let response = self.transport.send(&request)?;
        Ok(protocol::parse_allow_header(response.allow.as_deref()))
    }

    /// Send a request and decode the response envelope.
    ///
    /// Failure responses are turned into errors here. A successful
    /// envelope is returned as-is; checking its `status` is the caller's job.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        recognizers: &[&dyn Recognizer],
        caller: &Location<'_>,
    ) -> Result<Envelope, TwinError> {
        let uri = format!("{}{}", self.base_url, path);
        let body = body.map(json::encode).transpose()?;
        debug!(
            "Sending {} {}{}",
            method,
            uri,
            body.as_deref().map(|b| format!(" {}", b)).unwrap_or_default()
        );
        let request = HttpRequest {
            method,
            url: uri,
            body,
        };
        let response = self.transport.send(&request)?;
        debug!("Received {} for {} {}", response.status, method, request.url);
        interpret(&request.url, response, recognizers, caller)
    }
}

fn interpret(
    uri: &str,
    response: HttpResponse,
    recognizers: &[&dyn Recognizer],
    caller: &Location<'_>,
) -> Result<Envelope, TwinError> {
    let content_type = response.content_type.unwrap_or_default();
    let is_json = protocol::is_json_content_type(&content_type);

    if response.status >= 400 {
        return Err(error_response(uri, response.status, is_json, response.body, caller));
    }
    if response.body.is_empty() {
        return Err(TwinError::MissingEntity {
            uri: uri.to_string(),
        });
    }
    if !is_json {
        return Err(TwinError::WrongContentType {
            content_type,
            body: response.body,
        });
    }
    let decoded = json::decode(&response.body, recognizers)?;
    Envelope::from_value(decoded)
}

fn error_response(
    uri: &str,
    status: u16,
    is_json: bool,
    body: String,
    caller: &Location<'_>,
) -> TwinError {
    if is_json {
        let remote = match json::decode(&body, &[]) {
            Ok(Value::Map(envelope)) => RemoteError::from_envelope(&envelope, Some(caller)),
            Ok(_) | Err(_) => {
                warn!("Couldn't parse error response from {}", uri);
                RemoteError::unparseable("Couldn't parse error response", body)
            }
        };
        return TwinError::Remote(remote);
    }
    let remote = if status == 404 {
        RemoteError::new(
            ErrorCode::UnknownCommand,
            format!("Got server response {} for request {}", status, uri),
        )
    } else {
        RemoteError::unparseable(
            format!("Got server response {} for request {}", status, uri),
            body,
        )
    };
    TwinError::Remote(remote)
}
