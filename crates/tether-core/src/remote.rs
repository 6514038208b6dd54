//! Server-owned objects referenced by `{class, uuid}`.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::json::{object, CustomValue, JsonError, Map, Value};

/// Identity of one client-side session, used to scope remote objects.
///
/// Keys are unique within the process; two sessions talking to the same
/// server still get distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(u64);

impl SessionKey {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A reference to an object living on the server.
///
/// Equality and hashing use the owning session and the uuid only. The
/// properties delivered with the reference are kept as read-through data and
/// never sent back.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    type_tag: String,
    uuid: String,
    session: SessionKey,
    properties: Map,
}

impl RemoteObject {
    pub fn new(
        type_tag: impl Into<String>,
        uuid: impl Into<String>,
        session: SessionKey,
        properties: Map,
    ) -> Self {
        Self {
            type_tag: type_tag.into(),
            uuid: uuid.into(),
            session,
            properties,
        }
    }

    /// Build from a decoded object carrying string `class` and `uuid` keys.
    /// The remaining keys become the properties.
    pub fn from_map(map: &Map, session: SessionKey) -> Option<Self> {
        let type_tag = map.get("class")?.as_str()?;
        let uuid = map.get("uuid")?.as_str()?;
        let properties = map
            .iter()
            .filter(|(k, _)| k.as_str() != "class" && k.as_str() != "uuid")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self::new(type_tag, uuid, session, properties))
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn session(&self) -> SessionKey {
        self.session
    }

    pub fn properties(&self) -> &Map {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// The wire form: `{class, uuid}` and nothing else.
    pub fn to_wire(&self) -> Map {
        object([
            ("class", self.type_tag.as_str()),
            ("uuid", self.uuid.as_str()),
        ])
    }
}

impl PartialEq for RemoteObject {
    fn eq(&self, other: &Self) -> bool {
        self.session == other.session && self.uuid == other.uuid
    }
}

impl Eq for RemoteObject {}

impl Hash for RemoteObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.session.hash(state);
        self.uuid.hash(state);
    }
}

impl CustomValue for RemoteObject {
    fn to_json(&self) -> Result<Value, JsonError> {
        Ok(Value::Map(self.to_wire()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_custom(&self, other: &dyn CustomValue) -> bool {
        other.downcast_ref::<RemoteObject>() == Some(self)
    }
}

/// A recognizer producing [`RemoteObject`]s owned by `session`.
pub fn remote_object_recognizer(session: SessionKey) -> impl Fn(&Map) -> Option<Value> {
    move |map: &Map| RemoteObject::from_map(map, session).map(Value::custom)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::json::{decode, encode};

    #[test]
    fn test_recognizes_class_and_uuid() {
        let key = SessionKey::next();
        let recognizer = remote_object_recognizer(key);
        let value = decode(
            r#"{"value":{"class":"Button","uuid":"u-1","name":"OK","controlPatterns":[]}}"#,
            &[&recognizer],
        )
        .unwrap();
        let remote = value
            .get("value")
            .and_then(|v| v.downcast_ref::<RemoteObject>())
            .unwrap();
        assert_eq!(remote.type_tag(), "Button");
        assert_eq!(remote.uuid(), "u-1");
        assert_eq!(remote.property("name"), Some(&Value::from("OK")));
        assert!(remote.property("class").is_none());
        assert_eq!(remote.session(), key);
    }

    #[test]
    fn test_non_string_fields_are_not_recognized() {
        let recognizer = remote_object_recognizer(SessionKey::next());
        let value = decode(r#"{"class":"Button","uuid":7}"#, &[&recognizer]).unwrap();
        assert!(value.as_map().is_some());
    }

    #[test]
    fn test_wire_form_drops_properties() {
        let remote = RemoteObject::new(
            "Edit",
            "abc",
            SessionKey::next(),
            object([("name", "field")]),
        );
        assert_eq!(
            encode(&Value::custom(remote)).unwrap(),
            r#"{"class":"Edit","uuid":"abc"}"#
        );
    }

    #[test]
    fn test_identity_is_session_and_uuid() {
        let s1 = SessionKey::next();
        let s2 = SessionKey::next();
        let a = RemoteObject::new("Button", "x", s1, Map::new());
        let b = RemoteObject::new("Edit", "x", s1, object([("name", "other")]));
        let c = RemoteObject::new("Button", "x", s2, Map::new());
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
