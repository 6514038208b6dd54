//! Wire envelope and path conventions of the session protocol.

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, TwinError};
use crate::exception::RemoteError;
use crate::json::{object, Map, Value};

/// Content type sent with every request body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP methods used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for `application/json` and its parameterised forms.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type == "application/json" || content_type.starts_with("application/json;")
}

/// Path of a session-scoped resource: leading slashes are dropped and the
/// result is placed under `/session/{id}/`.
pub fn session_path(session_id: &str, path: &str) -> String {
    format!("/session/{}/{}", session_id, path.trim_start_matches('/'))
}

/// Split an `Allow` header into method names.
pub fn parse_allow_header(header: Option<&str>) -> Vec<String> {
    match header {
        Some(value) if !value.trim().is_empty() => value
            .split(',')
            .map(|m| m.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Body of the `POST /session` request.
pub fn new_session_body(desired_capabilities: &Map, session_setup: &Map) -> Map {
    object([
        ("desiredCapabilities", Value::Map(desired_capabilities.clone())),
        ("sessionSetup", Value::Map(session_setup.clone())),
    ])
}

/// A decoded response envelope: `{status, sessionId, value}`.
#[derive(Debug, Clone)]
pub struct Envelope {
    map: Map,
}

impl Envelope {
    pub fn new(map: Map) -> Self {
        Self { map }
    }

    /// Wrap a decoded body, which must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self, TwinError> {
        match value {
            Value::Map(map) => Ok(Self::new(map)),
            other => Err(TwinError::WrongResponseShape {
                expected: "object",
                found: other.kind().to_string(),
            }),
        }
    }

    /// The status kind; a missing status reads as unknown error.
    pub fn status(&self) -> ErrorCode {
        self.map
            .get("status")
            .and_then(Value::as_i64)
            .map_or(ErrorCode::UnknownError, ErrorCode::from_code)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.map.get("sessionId").and_then(Value::as_str)
    }

    pub fn value(&self) -> Option<&Value> {
        self.map.get("value")
    }

    pub fn as_map(&self) -> &Map {
        &self.map
    }

    /// Pass successful envelopes through; rebuild anything else as the
    /// remote error it reports.
    pub fn ensure_success(self, caller: Option<&Location<'_>>) -> Result<Self, TwinError> {
        if self.status() == ErrorCode::Success {
            Ok(self)
        } else {
            Err(TwinError::Remote(RemoteError::from_envelope(
                &self.map, caller,
            )))
        }
    }

    /// The `value` member of a successful envelope.
    pub fn into_value(mut self) -> Result<Value, TwinError> {
        match self.map.shift_remove("value") {
            Some(value) => Ok(value),
            None => Err(TwinError::Remote(RemoteError::new(
                ErrorCode::UnknownError,
                format!(
                    "Got success response with no value set: {}",
                    Value::Map(self.map)
                ),
            ))),
        }
    }
}
