//! Scroll bars.

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};
use tether_core::error::TwinError;
use tether_core::json::{object, Value};
use tether_core::protocol::Method;
use tether_core::remote::RemoteObject;

use crate::geometry::Rect;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Element path suffix that yields the scroll bar for this axis.
    pub(crate) const fn axis_path(self) -> &'static str {
        match self {
            Orientation::Horizontal => "axisX",
            Orientation::Vertical => "axisY",
        }
    }

    /// Leading edge of `rect` along this axis.
    pub fn min(self, rect: Rect) -> i32 {
        match self {
            Orientation::Horizontal => rect.x,
            Orientation::Vertical => rect.y,
        }
    }

    /// Trailing edge of `rect` along this axis.
    pub fn max(self, rect: Rect) -> i32 {
        self.min(rect).saturating_add(self.extent(rect))
    }

    pub fn mid(self, rect: Rect) -> f64 {
        f64::from(self.min(rect)) + f64::from(self.extent(rect)) / 2.0
    }

    pub fn extent(self, rect: Rect) -> i32 {
        match self {
            Orientation::Horizontal => rect.width,
            Orientation::Vertical => rect.height,
        }
    }

    /// True if `child` lies within `container` along this axis.
    pub fn contains(self, container: Rect, child: Rect) -> bool {
        self.min(container) <= self.min(child) && self.max(container) >= self.max(child)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        })
    }
}

impl From<Orientation> for Value {
    fn from(orientation: Orientation) -> Self {
        Value::from(match orientation {
            Orientation::Horizontal => "Horizontal",
            Orientation::Vertical => "Vertical",
        })
    }
}

/// One scroll axis of an element.
#[derive(Debug, Clone)]
pub struct ScrollBar {
    session: Session,
    remote: RemoteObject,
    orientation: Orientation,
}

impl ScrollBar {
    pub(crate) fn new(session: Session, remote: RemoteObject, orientation: Orientation) -> Self {
        Self {
            session,
            remote,
            orientation,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn path(&self) -> String {
        format!("axis/{}", self.remote.uuid())
    }

    /// Scroll position as a percentage.
    #[track_caller]
    pub fn position(&self) -> Result<f64, TwinError> {
        let value = self
            .session
            .request_at(Method::Get, &self.path(), None, Location::caller())?;
        value.as_f64().ok_or_else(|| TwinError::WrongResponseShape {
            expected: "number",
            found: value.kind().to_string(),
        })
    }

    #[track_caller]
    pub fn set_position(&self, position: f64) -> Result<(), TwinError> {
        let body = Value::Map(object([("position", position)]));
        self.session
            .request_at(Method::Post, &self.path(), Some(&body), Location::caller())?;
        Ok(())
    }
}

impl PartialEq for ScrollBar {
    fn eq(&self, other: &Self) -> bool {
        self.remote == other.remote
    }
}
