//! Search criteria evaluated by the server.
//!
//! A criteria tree is built from property comparisons combined with `and`,
//! `or` and `not`:
//!
//! ```
//! use tether_core::capability::ControlType;
//! use tether_core::criteria::{and, name, of_type};
//!
//! let ok_button = and([name("OK"), of_type(ControlType::Button)]);
//! assert_eq!(
//!     ok_button.to_json().to_string(),
//!     r#"{"type":"and","target":[{"type":"property","name":"name","value":"OK"},{"type":"property","name":"controlType","value":"Button"}]}"#
//! );
//! ```
//!
//! Trees are immutable and cheap to clone, so a criteria value can be built
//! once and reused across searches.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::capability::{self, Facet};
use crate::error::TwinError;
use crate::json::{object, CustomValue, JsonError, Value};

#[derive(Debug, PartialEq)]
enum Node {
    Property { name: String, value: Value },
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    Not(Criteria),
}

/// A predicate over elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria(Arc<Node>);

impl Criteria {
    fn node(node: Node) -> Self {
        Criteria(Arc::new(node))
    }

    /// Matches when both `self` and `other` match.
    pub fn and(&self, other: Criteria) -> Criteria {
        and([self.clone(), other])
    }

    /// Matches when either `self` or `other` matches.
    pub fn or(&self, other: Criteria) -> Criteria {
        or([self.clone(), other])
    }

    /// Matches when `self` does not.
    pub fn not(&self) -> Criteria {
        Criteria::node(Node::Not(self.clone()))
    }

    /// The predicate tree in wire form.
    pub fn to_json(&self) -> Value {
        let map = match self.0.as_ref() {
            Node::Property { name, value } => object([
                ("type", Value::from("property")),
                ("name", Value::from(name)),
                ("value", value.clone()),
            ]),
            Node::And(children) => object([
                ("type", Value::from("and")),
                ("target", children.iter().map(Criteria::to_json).collect::<Vec<_>>().into()),
            ]),
            Node::Or(children) => object([
                ("type", Value::from("or")),
                ("target", children.iter().map(Criteria::to_json).collect::<Vec<_>>().into()),
            ]),
            Node::Not(child) => object([("type", Value::from("not")), ("target", child.to_json())]),
        };
        Value::Map(map)
    }
}

impl CustomValue for Criteria {
    fn to_json(&self) -> Result<Value, JsonError> {
        Ok(Criteria::to_json(self))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_custom(&self, other: &dyn CustomValue) -> bool {
        other.downcast_ref::<Criteria>() == Some(self)
    }
}

impl From<Criteria> for Value {
    fn from(criteria: Criteria) -> Self {
        Value::custom(criteria)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_ref() {
            Node::Property { name, value } => write!(f, "{}={}", name, value),
            Node::And(children) | Node::Or(children) => {
                let joiner = if matches!(self.0.as_ref(), Node::And(_)) {
                    " and "
                } else {
                    " or "
                };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Node::Not(child) => write!(f, "not {}", child),
        }
    }
}

/// Matches when every criterion matches.
pub fn and(criteria: impl IntoIterator<Item = Criteria>) -> Criteria {
    Criteria::node(Node::And(criteria.into_iter().collect()))
}

/// Matches when any criterion matches.
pub fn or(criteria: impl IntoIterator<Item = Criteria>) -> Criteria {
    Criteria::node(Node::Or(criteria.into_iter().collect()))
}

pub fn not(criteria: &Criteria) -> Criteria {
    criteria.not()
}

/// Matches when the element's `property` equals `value`. The server must
/// support querying by that property.
pub fn property_equals(property: impl Into<String>, value: impl Into<Value>) -> Criteria {
    Criteria::node(Node::Property {
        name: property.into(),
        value: value.into(),
    })
}

pub fn name(name: impl Into<String>) -> Criteria {
    property_equals("name", name.into())
}

pub fn class_name(class_name: impl Into<String>) -> Criteria {
    property_equals("className", class_name.into())
}

pub fn id(id: impl Into<String>) -> Criteria {
    property_equals("id", id.into())
}

pub fn enabled(enabled: bool) -> Criteria {
    property_equals("enabled", enabled)
}

pub fn value(value: impl Into<String>) -> Criteria {
    property_equals("value", value.into())
}

/// Matches elements of a control type, or exposing a control pattern.
pub fn of_type(facet: impl Into<Facet>) -> Criteria {
    match facet.into() {
        Facet::Type(t) => property_equals("controlType", t.wire_name()),
        Facet::Pattern(p) => property_equals("controlPattern", p.wire_name()),
    }
}

/// Like [`of_type`], with the facet given by its wire name.
///
/// Names that are neither a control type nor a control pattern are rejected
/// without contacting the server.
pub fn type_named(name: &str) -> Result<Criteria, TwinError> {
    capability::facet(name)
        .map(of_type)
        .ok_or_else(|| TwinError::InvalidCriteriaTarget {
            name: name.to_string(),
        })
}
