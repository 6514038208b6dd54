//! Control pattern views.

use std::panic::Location;

use tether_core::capability::{ControlPattern, Facet};
use tether_core::error::TwinError;
use tether_core::json::{object, Value};
use tether_core::protocol::Method;

use super::{expect_bool, expect_optional_string, Element};
use crate::geometry::{Point, Rect, Size};
use crate::session::expect_object;

facet_view! {
    /// Elements whose value can be read and, unless read-only, written.
    Editable => Facet::Pattern(ControlPattern::Editable)
}

facet_view! {
    /// Tree nodes, combo boxes and the like that expand and collapse.
    Expandable => Facet::Pattern(ControlPattern::Expandable)
}

facet_view! {
    Selectable => Facet::Pattern(ControlPattern::Selectable)
}

facet_view! {
    /// Lists and other containers of [`Selectable`] items.
    SelectionContainer => Facet::Pattern(ControlPattern::SelectionContainer)
}

facet_view! {
    Toggle => Facet::Pattern(ControlPattern::Toggle)
}

facet_view! {
    /// Elements that can be moved or resized.
    Transformable => Facet::Pattern(ControlPattern::Transformable)
}

impl Editable {
    #[track_caller]
    pub fn value(&self) -> Result<Option<String>, TwinError> {
        self.check("value")?;
        expect_optional_string(self.call(Method::Get, "value", None, Location::caller())?)
    }

    #[track_caller]
    pub fn set_value(&self, value: &str) -> Result<(), TwinError> {
        self.check("set_value")?;
        self.call(
            Method::Post,
            "value",
            Some(object([("value", value)])),
            Location::caller(),
        )?;
        Ok(())
    }

    /// True when the server won't accept writes to the value.
    pub fn is_read_only(&self) -> Result<bool, TwinError> {
        self.check("is_read_only")?;
        let allowed = self.session().options(&self.path("value"))?;
        Ok(!allowed.iter().any(|m| m.eq_ignore_ascii_case("POST")))
    }
}

impl Expandable {
    #[track_caller]
    pub fn is_expanded(&self) -> Result<bool, TwinError> {
        self.check("is_expanded")?;
        expect_bool(self.call(Method::Get, "expanded", None, Location::caller())?)
    }

    #[track_caller]
    pub fn set_expanded(&self, expanded: bool) -> Result<(), TwinError> {
        self.check("set_expanded")?;
        self.call(
            Method::Post,
            "expanded",
            Some(object([("expanded", expanded)])),
            Location::caller(),
        )?;
        Ok(())
    }

    #[track_caller]
    pub fn expand(&self) -> Result<(), TwinError> {
        self.set_expanded(true)
    }

    #[track_caller]
    pub fn collapse(&self) -> Result<(), TwinError> {
        self.set_expanded(false)
    }
}

impl Selectable {
    #[track_caller]
    pub fn is_selected(&self) -> Result<bool, TwinError> {
        self.check("is_selected")?;
        expect_bool(self.call(Method::Get, "selected", None, Location::caller())?)
    }

    #[track_caller]
    pub fn set_selected(&self, selected: bool) -> Result<(), TwinError> {
        self.check("set_selected")?;
        self.call(
            Method::Post,
            "selected",
            Some(object([("selected", selected)])),
            Location::caller(),
        )?;
        Ok(())
    }

    #[track_caller]
    pub fn select(&self) -> Result<(), TwinError> {
        self.set_selected(true)
    }

    /// The container this item is selected within.
    #[track_caller]
    pub fn container(&self) -> Result<SelectionContainer, TwinError> {
        self.check("container")?;
        let value = self.call(Method::Get, "selection-container", None, Location::caller())?;
        SelectionContainer::try_from(Element::from_value(self.session(), value)?)
    }
}

/// Reply of `GET selection`.
struct SelectionState {
    multiple: bool,
    required: bool,
    values: Vec<Value>,
}

impl SelectionContainer {
    fn selection_state(
        &self,
        method: &'static str,
        caller: &Location<'_>,
    ) -> Result<SelectionState, TwinError> {
        self.check(method)?;
        let mut map = expect_object(self.call(Method::Get, "selection", None, caller)?)?;
        let flag = |value: Option<&Value>| value.and_then(Value::as_bool).unwrap_or(false);
        Ok(SelectionState {
            multiple: flag(map.get("multiple")),
            required: flag(map.get("required")),
            values: match map.shift_remove("values") {
                Some(Value::List(values)) => values,
                _ => Vec::new(),
            },
        })
    }

    #[track_caller]
    pub fn is_multiple_selection_allowed(&self) -> Result<bool, TwinError> {
        Ok(self
            .selection_state("is_multiple_selection_allowed", Location::caller())?
            .multiple)
    }

    #[track_caller]
    pub fn is_selection_required(&self) -> Result<bool, TwinError> {
        Ok(self
            .selection_state("is_selection_required", Location::caller())?
            .required)
    }

    /// Every selected item.
    #[track_caller]
    pub fn selection(&self) -> Result<Vec<Selectable>, TwinError> {
        let state = self.selection_state("selection", Location::caller())?;
        self.selectables(state.values)
    }

    /// The one selected item, if any. More than one is an error.
    #[track_caller]
    pub fn selected_item(&self) -> Result<Option<Selectable>, TwinError> {
        let state = self.selection_state("selected_item", Location::caller())?;
        let mut items = self.selectables(state.values)?;
        match items.len() {
            0 => Ok(None),
            1 => Ok(items.pop()),
            count => Err(TwinError::MultipleMatches { count }),
        }
    }

    fn selectables(&self, values: Vec<Value>) -> Result<Vec<Selectable>, TwinError> {
        values
            .into_iter()
            .map(|value| Selectable::try_from(Element::from_value(self.session(), value)?))
            .collect()
    }
}

impl Toggle {
    #[track_caller]
    pub fn state(&self) -> Result<bool, TwinError> {
        self.check("state")?;
        expect_bool(self.call(Method::Get, "toggle", None, Location::caller())?)
    }

    #[track_caller]
    pub fn set_state(&self, state: bool) -> Result<(), TwinError> {
        self.check("set_state")?;
        self.call(
            Method::Post,
            "toggle",
            Some(object([("state", state)])),
            Location::caller(),
        )?;
        Ok(())
    }

    /// Flip the state and return the new one.
    #[track_caller]
    pub fn toggle(&self) -> Result<bool, TwinError> {
        self.check("toggle")?;
        expect_bool(self.call(Method::Post, "toggle", None, Location::caller())?)
    }
}

impl Transformable {
    #[track_caller]
    pub fn set_size(&self, size: Size) -> Result<(), TwinError> {
        self.check("set_size")?;
        self.call(Method::Post, "size", Some(size.to_map()), Location::caller())?;
        Ok(())
    }

    #[track_caller]
    pub fn set_location(&self, location: Point) -> Result<(), TwinError> {
        self.check("set_location")?;
        self.call(
            Method::Post,
            "location",
            Some(location.to_map()),
            Location::caller(),
        )?;
        Ok(())
    }

    #[track_caller]
    pub fn set_bounds(&self, bounds: Rect) -> Result<(), TwinError> {
        self.check("set_bounds")?;
        self.call(Method::Post, "bounds", Some(bounds.to_map()), Location::caller())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpResponse;

    #[test]
    fn test_editable_value_round_trip() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let edit = fetch_element(&mock, &session, "Edit", &["edit"])
            .view::<Editable>()
            .unwrap();

        mock.ok(r#""hello""#);
        assert_eq!(edit.value().unwrap().as_deref(), Some("hello"));
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/element/e1/value");

        mock.ok("null");
        edit.set_value("bye").unwrap();
        assert_eq!(mock.last().method, Method::Post);
        assert_eq!(mock.last().body.as_deref(), Some(r#"{"value":"bye"}"#));
    }

    #[test]
    fn test_read_only_from_options() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let edit = fetch_element(&mock, &session, "Edit", &["edit"])
            .view::<Editable>()
            .unwrap();
        mock.push(Ok(HttpResponse {
            status: 200,
            allow: Some("GET, OPTIONS".into()),
            ..HttpResponse::default()
        }));
        assert!(edit.is_read_only().unwrap());
        assert_eq!(mock.last().method, Method::Options);

        mock.push(Ok(HttpResponse {
            status: 200,
            allow: Some("GET, POST".into()),
            ..HttpResponse::default()
        }));
        assert!(!edit.is_read_only().unwrap());
    }

    #[test]
    fn test_toggle() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let check_box = fetch_element(&mock, &session, "CheckBox", &["toggle"])
            .view::<Toggle>()
            .unwrap();
        mock.ok("true");
        assert!(check_box.toggle().unwrap());
        assert_eq!(mock.last().body, None);
        mock.ok("null");
        check_box.set_state(false).unwrap();
        assert_eq!(mock.last().body.as_deref(), Some(r#"{"state":false}"#));
    }

    #[test]
    fn test_selection_container() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let list = fetch_element(&mock, &session, "ListControl", &["select-container"])
            .view::<SelectionContainer>()
            .unwrap();
        let reply = format!(
            r#"{{"multiple":true,"required":false,"values":[{},{}]}}"#,
            element_json("i1", "ListItem", &["select"]),
            element_json("i2", "ListItem", &["select"])
        );

        mock.ok(&reply);
        assert!(list.is_multiple_selection_allowed().unwrap());
        mock.ok(&reply);
        let selection = list.selection().unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection[1].uuid(), Some("i2"));
        mock.ok(&reply);
        assert!(matches!(
            list.selected_item(),
            Err(TwinError::MultipleMatches { count: 2 })
        ));
    }

    #[test]
    fn test_transform_requires_pattern() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let window = fetch_element(&mock, &session, "Window", &[]);
        assert!(window.view::<Transformable>().is_err());

        let window = fetch_element(&mock, &session, "Window", &["transform"]);
        let transform = window.view::<Transformable>().unwrap();
        mock.ok("null");
        transform.set_size(Size::new(640, 480)).unwrap();
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/element/e1/size");
        assert_eq!(mock.last().body.as_deref(), Some(r#"{"width":640,"height":480}"#));
    }

    #[test]
    fn test_expandable() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let node = fetch_element(&mock, &session, "TreeItem", &["expand"])
            .view::<Expandable>()
            .unwrap();
        mock.ok("null");
        node.expand().unwrap();
        assert_eq!(mock.last().body.as_deref(), Some(r#"{"expanded":true}"#));
        mock.ok("false");
        assert!(!node.is_expanded().unwrap());
    }
}
