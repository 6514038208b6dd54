//! The server's clipboard.

use std::panic::Location;

use tether_core::error::TwinError;
use tether_core::json::{object, Value};
use tether_core::protocol::Method;

use crate::session::Session;

const PATH: &str = "clipboard";

/// Handle on the clipboard of a session's desktop.
///
/// Holds no state of its own; any number of handles may exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    session: Session,
}

impl Clipboard {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Text content, or `None` if the clipboard holds something else.
    #[track_caller]
    pub fn text(&self) -> Result<Option<String>, TwinError> {
        let mut data = self
            .session
            .request_object(Method::Get, PATH, None)?;
        let is_text = data
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case("text"));
        if !is_text {
            return Ok(None);
        }
        Ok(match data.shift_remove("text") {
            Some(Value::String(text)) => Some(text),
            _ => None,
        })
    }

    #[track_caller]
    pub fn set_text(&self, text: &str) -> Result<(), TwinError> {
        let body = Value::Map(object([("type", "text"), ("text", text)]));
        self.session
            .request_at(Method::Post, PATH, Some(&body), Location::caller())?;
        Ok(())
    }

    #[track_caller]
    pub fn clear(&self) -> Result<(), TwinError> {
        self.session
            .request_at(Method::Delete, PATH, None, Location::caller())?;
        Ok(())
    }

    #[track_caller]
    pub fn is_empty(&self) -> Result<bool, TwinError> {
        let data = self
            .session
            .request_object(Method::Get, PATH, None)?;
        Ok(data.get("type").map_or(true, Value::is_null))
    }
}
