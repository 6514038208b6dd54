//! Error types with status-code mapping and hints.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::Facet;
use crate::exception::RemoteError;
use crate::json::JsonError;

/// Status codes carried in the `status` field of a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Success,
    NoSuchElement,
    NoSuchFrame,
    UnknownCommand,
    StaleElementReference,
    ElementNotVisible,
    InvalidElementState,
    UnknownError,
    ElementNotSelectable,
    XPathLookupError,
    /// Shares code 13 with [`ErrorCode::UnknownError`], which wins the
    /// lookup, so this kind never comes back from [`ErrorCode::from_code`].
    NoSuchWindow,
    InvalidCookieDomain,
    CannotSetCookie,
    NoSuchSession,
}

impl ErrorCode {
    /// Lookup order for [`ErrorCode::from_code`]; the first code match wins.
    const TABLE: [ErrorCode; 14] = [
        ErrorCode::Success,
        ErrorCode::NoSuchElement,
        ErrorCode::NoSuchFrame,
        ErrorCode::UnknownCommand,
        ErrorCode::StaleElementReference,
        ErrorCode::ElementNotVisible,
        ErrorCode::InvalidElementState,
        ErrorCode::UnknownError,
        ErrorCode::ElementNotSelectable,
        ErrorCode::XPathLookupError,
        ErrorCode::NoSuchWindow,
        ErrorCode::InvalidCookieDomain,
        ErrorCode::CannotSetCookie,
        ErrorCode::NoSuchSession,
    ];

    /// The numeric code sent on the wire.
    pub const fn code(self) -> i64 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::NoSuchElement => 1,
            ErrorCode::NoSuchFrame => 2,
            ErrorCode::UnknownCommand => 9,
            ErrorCode::StaleElementReference => 10,
            ErrorCode::ElementNotVisible => 11,
            ErrorCode::InvalidElementState => 12,
            ErrorCode::UnknownError => 13,
            ErrorCode::ElementNotSelectable => 14,
            ErrorCode::XPathLookupError => 19,
            ErrorCode::NoSuchWindow => 13,
            ErrorCode::InvalidCookieDomain => 24,
            ErrorCode::CannotSetCookie => 25,
            ErrorCode::NoSuchSession => 100,
        }
    }

    /// Map a wire code to its kind. Unknown codes map to `UnknownError`.
    pub fn from_code(code: i64) -> Self {
        Self::TABLE
            .iter()
            .copied()
            .find(|kind| kind.code() == code)
            .unwrap_or(ErrorCode::UnknownError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Success => "SUCCESS",
            ErrorCode::NoSuchElement => "NO_SUCH_ELEMENT",
            ErrorCode::NoSuchFrame => "NO_SUCH_FRAME",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::StaleElementReference => "STALE_ELEMENT_REFERENCE",
            ErrorCode::ElementNotVisible => "ELEMENT_NOT_VISIBLE",
            ErrorCode::InvalidElementState => "INVALID_ELEMENT_STATE",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::ElementNotSelectable => "ELEMENT_NOT_SELECTABLE",
            ErrorCode::XPathLookupError => "X_PATH_LOOKUP_ERROR",
            ErrorCode::NoSuchWindow => "NO_SUCH_WINDOW",
            ErrorCode::InvalidCookieDomain => "INVALID_COOKIE_DOMAIN",
            ErrorCode::CannotSetCookie => "CANNOT_SET_COOKIE",
            ErrorCode::NoSuchSession => "NO_SUCH_SESSION",
        };
        f.write_str(name)
    }
}

/// Every failure a client operation can report.
#[derive(Debug, Error)]
pub enum TwinError {
    #[error(transparent)]
    Json(#[from] JsonError),

    /// The session or resource is not in a state that allows the call.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The element does not currently expose the facet a call needs.
    #[error("{}", capability_message(*facet, *method))]
    CapabilityNotSupported {
        facet: Facet,
        method: Option<&'static str>,
    },

    /// A name given to a criteria builder is not a known type or pattern.
    #[error("'{name}' is not a known control type or control pattern")]
    InvalidCriteriaTarget { name: String },

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("wrong content type '{content_type}'; body is {body}")]
    WrongContentType { content_type: String, body: String },

    #[error("response for {uri} has no entity")]
    MissingEntity { uri: String },

    #[error("expected {expected} in response but got {found}")]
    WrongResponseShape {
        expected: &'static str,
        found: String,
    },

    #[error("expected exactly one match but found {count}")]
    MultipleMatches { count: usize },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

fn capability_message(facet: Facet, method: Option<&str>) -> String {
    match method {
        Some(method) => format!("'{}' requires {}, which the element does not support", method, facet),
        None => format!("element does not support {}", facet),
    }
}

impl TwinError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        TwinError::InvalidState(message.into())
    }

    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        TwinError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn capability(facet: impl Into<Facet>) -> Self {
        TwinError::CapabilityNotSupported {
            facet: facet.into(),
            method: None,
        }
    }

    /// The remote status kind, when this error came from the server.
    pub fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            TwinError::Remote(remote) => Some(remote.code),
            _ => None,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        self.remote_code() == Some(ErrorCode::NoSuchElement)
    }

    pub fn is_stale(&self) -> bool {
        self.remote_code() == Some(ErrorCode::StaleElementReference)
    }

    /// A hint for whoever reads the error, where one applies.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            TwinError::InvalidState(_) => {
                Some("Open a session with 'tether open' and pass its id with --session")
            }
            TwinError::CapabilityNotSupported { .. } => {
                Some("Run 'tether structure' to see the patterns the element exposes now")
            }
            TwinError::InvalidCriteriaTarget { .. } => {
                Some("Use a control type name such as Button or a pattern such as edit")
            }
            TwinError::Transport { .. } => {
                Some("Check that the automation server is running and TETHER_URL points at it")
            }
            TwinError::Remote(remote) => match remote.code {
                ErrorCode::NoSuchSession => {
                    Some("The session has ended; open a new one with 'tether open'")
                }
                ErrorCode::StaleElementReference => {
                    Some("The element is gone; search for it again")
                }
                ErrorCode::NoSuchElement => Some("Check the search criteria, or wait longer"),
                _ => None,
            },
            _ => None,
        }
    }
}
