//! Screen coordinates as the server reports them.

use serde::{Deserialize, Serialize};
use tether_core::error::TwinError;
use tether_core::json::{object, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// An axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Read `{x, y, width, height}`.
    pub fn from_value(value: &Value) -> Result<Self, TwinError> {
        let map = value.as_map().ok_or_else(|| TwinError::WrongResponseShape {
            expected: "bounds object",
            found: value.kind().to_string(),
        })?;
        Ok(Self::new(
            coordinate(map, "x")?,
            coordinate(map, "y")?,
            coordinate(map, "width")?,
            coordinate(map, "height")?,
        ))
    }

    pub fn to_map(&self) -> Map {
        object([
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ])
    }
}

impl Point {
    pub fn to_map(&self) -> Map {
        object([("x", self.x), ("y", self.y)])
    }
}

impl Size {
    pub fn to_map(&self) -> Map {
        object([("width", self.width), ("height", self.height)])
    }
}

/// Integer coordinate; fractional values from the server are rounded.
fn coordinate(map: &Map, key: &'static str) -> Result<i32, TwinError> {
    let value = map.get(key);
    let number = match value {
        Some(Value::Double(d)) if d.is_finite() => Some(d.round() as i64),
        Some(v) => v.as_i64(),
        None => None,
    };
    number
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| TwinError::WrongResponseShape {
            expected: "integer coordinate",
            found: format!(
                "{} for '{}'",
                value.map_or("nothing", Value::kind),
                key
            ),
        })
}
