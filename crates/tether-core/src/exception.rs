//! Reconstruction of exceptions reported by the server.
//!
//! A failed call answers with `{"status": n, "value": {...}}` where the value
//! carries `message`, an optional `class`, an optional `stackTrace` and an
//! optional nested `cause`. [`RemoteError::from_envelope`] rebuilds that into
//! a local error without touching the network.
//!
//! When the server sends a stack trace, one local frame is appended after the
//! remote frames: the source location of the public client call that issued
//! the request, as seen by `#[track_caller]`. It is a single call site, not a
//! captured backtrace; frames above the caller are not recorded.

use std::fmt;
use std::panic::Location;

use tracing::warn;

use crate::error::ErrorCode;
use crate::json::{Map, Value};

/// One frame of a reconstructed stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
}

impl StackFrame {
    fn from_map(map: &Map) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            class_name: text("className"),
            method_name: text("methodName"),
            file_name: text("fileName"),
            line_number: map
                .get("lineNumber")
                .and_then(Value::as_i64)
                .and_then(|n| u32::try_from(n).ok()),
        }
    }

    /// The frame of a local call site.
    pub fn local(location: &Location<'_>) -> Self {
        Self {
            class_name: None,
            method_name: None,
            file_name: Some(location.file().to_string()),
            line_number: Some(location.line()),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("at ")?;
        match (&self.class_name, &self.method_name) {
            (Some(class), Some(method)) => write!(f, "{}.{}", class, method)?,
            (Some(name), None) | (None, Some(name)) => f.write_str(name)?,
            (None, None) => f.write_str("<local>")?,
        }
        match (&self.file_name, self.line_number) {
            (Some(file), Some(line)) => write!(f, " ({}:{})", file, line),
            (Some(file), None) => write!(f, " ({})", file),
            _ => f.write_str(" (unknown source)"),
        }
    }
}

/// An error raised on the server, or built locally in the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: Option<String>,
    /// Remote exception class, used for display only.
    pub class_name: Option<String>,
    pub stack_trace: Vec<StackFrame>,
    pub cause: Option<Box<RemoteError>>,
    /// The undecodable response body, when reconstruction had to give up.
    pub raw: Option<String>,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            class_name: None,
            stack_trace: Vec::new(),
            cause: None,
            raw: None,
        }
    }

    /// An unknown error carrying a body that could not be interpreted.
    pub fn unparseable(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::new(ErrorCode::UnknownError, message)
        }
    }

    /// Rebuild an error from a failure envelope.
    ///
    /// A missing `status` selects [`ErrorCode::UnknownError`]. The `cause`
    /// chain is rebuilt to any depth, each link as an unknown error. Shapes
    /// that cannot be read degrade to an unknown error carrying the encoded
    /// envelope.
    pub fn from_envelope(envelope: &Map, caller: Option<&Location<'_>>) -> Self {
        let code = match envelope.get("status") {
            None | Some(Value::Null) => ErrorCode::UnknownError,
            Some(status) => {
                let numeric = status.as_i64().or_else(|| status.as_f64().map(|d| d as i64));
                match numeric {
                    Some(n) => ErrorCode::from_code(n),
                    None => return Self::degraded(envelope, "status is not a number"),
                }
            }
        };
        match envelope.get("value") {
            Some(Value::Map(exception)) => Self::from_exception(code, exception, caller)
                .unwrap_or_else(|reason| Self::degraded(envelope, reason)),
            Some(Value::String(message)) => Self::new(code, message.clone()),
            None | Some(Value::Null) => Self {
                message: None,
                ..Self::new(code, String::new())
            },
            Some(_) => Self::degraded(envelope, "value is not an exception object"),
        }
    }

    fn from_exception(
        code: ErrorCode,
        exception: &Map,
        caller: Option<&Location<'_>>,
    ) -> Result<Self, &'static str> {
        let optional_text = |key: &'static str| -> Result<Option<String>, &'static str> {
            match exception.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(key),
            }
        };
        let message = optional_text("message").map_err(|_| "message is not a string")?;
        let class_name = optional_text("class").map_err(|_| "class is not a string")?;

        let mut stack_trace = Vec::new();
        match exception.get("stackTrace") {
            None | Some(Value::Null) => {}
            Some(Value::List(frames)) => {
                for frame in frames {
                    let frame = frame.as_map().ok_or("stack frame is not an object")?;
                    stack_trace.push(StackFrame::from_map(frame));
                }
                if let Some(location) = caller {
                    stack_trace.push(StackFrame::local(location));
                }
            }
            Some(_) => return Err("stackTrace is not a list"),
        }

        let cause = match exception.get("cause") {
            None | Some(Value::Null) => None,
            Some(Value::Map(cause)) => Some(Box::new(Self::from_exception(
                ErrorCode::UnknownError,
                cause,
                caller,
            )?)),
            Some(_) => return Err("cause is not an object"),
        };

        Ok(Self {
            code,
            message,
            class_name,
            stack_trace,
            cause,
            raw: None,
        })
    }

    fn degraded(envelope: &Map, reason: &str) -> Self {
        let raw = Value::Map(envelope.clone()).to_string();
        warn!("Unreadable exception in response ({}): {}", reason, raw);
        Self::unparseable(format!("Couldn't parse error response: {}", reason), raw)
    }

    /// Causes from the immediate one outward.
    pub fn causes(&self) -> impl Iterator<Item = &RemoteError> {
        std::iter::successors(self.cause.as_deref(), |e| e.cause.as_deref())
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.class_name, &self.message) {
            (Some(class), Some(message)) => write!(f, "{}: {}", class, message)?,
            (Some(class), None) => f.write_str(class)?,
            (None, Some(message)) => write!(f, "[{}] {}", self.code, message)?,
            (None, None) => write!(f, "[{}]", self.code)?,
        }
        if let Some(raw) = &self.raw {
            write!(f, "\nBody is {}", raw)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
