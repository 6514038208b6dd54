//! Recognizers turn decoded objects into richer values.

use std::any::TypeId;

use super::{CustomValue, JsonError, Map, Value};

/// A rule consulted for every decoded object.
///
/// Returning `None` means "no match"; the next recognizer in the chain is
/// tried, and the object stays a plain map if none match.
pub trait Recognizer {
    fn recognize(&self, map: &Map) -> Option<Value>;
}

impl<F> Recognizer for F
where
    F: Fn(&Map) -> Option<Value>,
{
    fn recognize(&self, map: &Map) -> Option<Value> {
        self(map)
    }
}

/// A type that knows how to build itself from a decoded object.
pub trait FromJsonObject: CustomValue + Sized {
    fn from_json_object(map: &Map) -> Option<Self>;
}

type DecodeFn = fn(&Map) -> Option<Value>;

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

/// Recognizers registered by type, tried in registration order.
///
/// Each type can be registered once; a second registration is rejected
/// immediately instead of shadowing the first.
#[derive(Default)]
pub struct RecognizerTable {
    entries: Vec<Entry>,
}

fn decode_as<T: FromJsonObject>(map: &Map) -> Option<Value> {
    T::from_json_object(map).map(Value::custom)
}

impl RecognizerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` at the end of the chain.
    pub fn register<T: FromJsonObject>(&mut self) -> Result<&mut Self, JsonError> {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();
        if self.entries.iter().any(|e| e.type_id == type_id) {
            return Err(JsonError::DuplicateRecognizer { type_name });
        }
        self.entries.push(Entry {
            type_id,
            type_name,
            decode: decode_as::<T>,
        });
        Ok(self)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: FromJsonObject>(mut self) -> Result<Self, JsonError> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type names, in chain order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.type_name)
    }
}

impl Recognizer for RecognizerTable {
    fn recognize(&self, map: &Map) -> Option<Value> {
        self.entries.iter().find_map(|e| (e.decode)(map))
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::json::decode;

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl CustomValue for Point {
        fn to_json(&self) -> Result<Value, JsonError> {
            Ok(Value::Map(crate::json::object([("x", self.x), ("y", self.y)])))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl FromJsonObject for Point {
        fn from_json_object(map: &Map) -> Option<Self> {
            if map.len() != 2 {
                return None;
            }
            Some(Point {
                x: map.get("x")?.as_i64()?,
                y: map.get("y")?.as_i64()?,
            })
        }
    }

    #[derive(Debug)]
    struct Anything;

    impl CustomValue for Anything {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl FromJsonObject for Anything {
        fn from_json_object(_: &Map) -> Option<Self> {
            Some(Anything)
        }
    }

    #[test]
    fn test_registered_type_is_recognized() {
        let table = RecognizerTable::new().with::<Point>().unwrap();
        let value = decode(r#"[{"x":1,"y":2},{"x":1}]"#, &[&table]).unwrap();
        let items = value.as_list().unwrap();
        assert_eq!(items[0].downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
        assert!(items[1].as_map().is_some());
    }

    #[test]
    fn test_registration_order_decides() {
        let table = RecognizerTable::new()
            .with::<Point>()
            .unwrap()
            .with::<Anything>()
            .unwrap();
        let point = decode(r#"{"x":1,"y":2}"#, &[&table]).unwrap();
        assert!(point.downcast_ref::<Point>().is_some());
        let other = decode(r#"{"z":0}"#, &[&table]).unwrap();
        assert!(other.downcast_ref::<Anything>().is_some());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut table = RecognizerTable::new();
        table.register::<Point>().unwrap();
        let err = table.register::<Point>().err().unwrap();
        assert!(matches!(err, JsonError::DuplicateRecognizer { type_name } if type_name.ends_with("Point")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_as_chain_member() {
        let table = RecognizerTable::new().with::<Point>().unwrap();
        let fallback = |_: &Map| Some(Value::from("fallback"));
        let value = decode(r#"{"q":1}"#, &[&table, &fallback]).unwrap();
        assert_eq!(value, Value::from("fallback"));
    }
}
