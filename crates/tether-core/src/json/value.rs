//! The decoded JSON object model.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::JsonError;

/// A JSON object: string keys in insertion order, last write wins.
pub type Map = IndexMap<String, Value>;

/// A value that can take part in JSON encoding without being one of the
/// built-in variants.
///
/// Recognizers produce these during decode, and encoding asks them for a
/// replacement value via [`CustomValue::to_json`]. The replacement may itself
/// be another custom value; encoding keeps unwrapping until it reaches a
/// built-in variant.
pub trait CustomValue: Any + fmt::Debug + Send + Sync {
    /// The intermediate form this value encodes as.
    ///
    /// The default has no serialized form, so encoding fails with
    /// [`JsonError::Unsupported`].
    fn to_json(&self) -> Result<Value, JsonError> {
        Err(JsonError::Unsupported {
            type_name: std::any::type_name::<Self>(),
        })
    }

    /// Upcast used by [`Value::downcast_ref`].
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another custom value.
    fn eq_custom(&self, _other: &dyn CustomValue) -> bool {
        false
    }
}

impl<'a> dyn CustomValue + 'a {
    /// Borrow the concrete type behind a custom value.
    pub fn downcast_ref<T: CustomValue>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A decoded JSON value.
///
/// Integers keep the narrowest width that holds them: `Int` when the value
/// fits in 32 bits, `Long` otherwise. Comparisons treat the two as one
/// integer type.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
    /// A value produced by a recognizer, or supplied by the caller for encoding.
    Custom(Arc<dyn CustomValue>),
}

impl Value {
    /// Wrap a custom value.
    pub fn custom<T: CustomValue>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Narrow an integer to the smallest variant that holds it.
    pub fn integer(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::Long(n),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Int` and `Long`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of any number variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(f64::from(*n)),
            // Precision loss above 2^53 matches what the wire can carry anyway.
            Value::Long(n) => Some(*n as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Borrow the concrete type behind a `Custom` value.
    pub fn downcast_ref<T: CustomValue>(&self) -> Option<&T> {
        match self {
            Value::Custom(custom) => custom.as_ref().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Long(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Custom(_) => "custom",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => {
                Arc::ptr_eq(a, b) || a.eq_custom(b.as_ref())
            }
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    /// Encoded form when encodable, debug form otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match super::encode(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::integer(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::integer(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::integer(n),
            Err(_) => Value::Double(n as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<f32> for Value {
    fn from(d: f32) -> Self {
        Value::Double(f64::from(d))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::String(c.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::List(items.iter().cloned().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Build a [`Map`] from literal pairs.
///
/// ```
/// use tether_core::json::{object, Value};
///
/// let body = object([("verbose", Value::from(true))]);
/// assert_eq!(body.get("verbose"), Some(&Value::Bool(true)));
/// ```
pub fn object<K, V, I>(pairs: I) -> Map
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Marker(u8);

    impl CustomValue for Marker {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn eq_custom(&self, other: &dyn CustomValue) -> bool {
            other.downcast_ref::<Marker>().is_some_and(|m| m.0 == self.0)
        }
    }

    #[test]
    fn test_integer_narrows_by_magnitude() {
        assert!(matches!(Value::integer(5), Value::Int(5)));
        assert!(matches!(Value::integer(-2_147_483_648), Value::Int(_)));
        assert!(matches!(Value::integer(2_147_483_648), Value::Long(_)));
    }

    #[test]
    fn test_int_and_long_compare_equal() {
        assert_eq!(Value::Int(7), Value::Long(7));
        assert_ne!(Value::Int(7), Value::Double(7.0));
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = object([("x", 1), ("y", 2)]);
        let b = object([("y", 2), ("x", 1)]);
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn test_custom_values_compare_through_hook() {
        assert_eq!(Value::custom(Marker(1)), Value::custom(Marker(1)));
        assert_ne!(Value::custom(Marker(1)), Value::custom(Marker(2)));
        assert_eq!(
            Value::custom(Marker(3)).downcast_ref::<Marker>().map(|m| m.0),
            Some(3)
        );
    }

    #[derive(Debug)]
    struct Handle;

    impl CustomValue for Handle {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_default_custom_equality_is_identity() {
        let shared = Value::custom(Handle);
        assert_eq!(shared, shared.clone());
        assert_ne!(Value::custom(Handle), Value::custom(Handle));
    }

    #[test]
    fn test_char_and_option_conversions() {
        assert_eq!(Value::from('x'), Value::String("x".into()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(
            Value::from(["a", "b"]),
            Value::List(vec!["a".into(), "b".into()])
        );
    }
}
