//! Live proxies over remote UI elements.
//!
//! An [`Element`] wraps a remote reference together with the element's
//! control type and its current control patterns. The control type is fixed
//! when the element is first seen; the pattern set is whatever the server
//! last reported and can be re-read with [`Element::refresh`].
//!
//! Facet-specific methods live on view types ([`Editable`], [`Window`], ...)
//! obtained with [`Element::view`]. Every view method checks the live facet
//! set before it sends anything, so a call the element can't serve fails
//! locally with [`TwinError::CapabilityNotSupported`].

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::capability::{self, ControlPattern, ControlType, Facet};
use tether_core::criteria::{self, Criteria};
use tether_core::error::{ErrorCode, TwinError};
use tether_core::exception::RemoteError;
use tether_core::json::{object, Map, Value};
use tether_core::protocol::Method;
use tether_core::remote::RemoteObject;
use tracing::warn;

use crate::geometry::{Point, Rect, Size};
use crate::screenshot::Screenshot;
use crate::session::{expect_array, expect_object, Session};
use crate::wait::{poll, Timeout};

/// A view of an element through one facet.
pub trait FacetView: Sized {
    /// The facet the element must expose for the view to exist.
    const FACET: Facet;

    #[doc(hidden)]
    fn wrap(element: Element) -> Self;

    fn element(&self) -> &Element;
}

macro_rules! facet_view {
    ($(#[$meta:meta])* $name:ident => $facet:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(Element);

        impl $crate::element::FacetView for $name {
            const FACET: tether_core::capability::Facet = $facet;

            fn wrap(element: $crate::element::Element) -> Self {
                Self(element)
            }

            fn element(&self) -> &$crate::element::Element {
                &self.0
            }
        }

        impl TryFrom<$crate::element::Element> for $name {
            type Error = tether_core::error::TwinError;

            fn try_from(element: $crate::element::Element) -> Result<Self, Self::Error> {
                element.into_view()
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::element::Element;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl $name {
            fn check(&self, method: &'static str) -> Result<(), tether_core::error::TwinError> {
                self.0.check_method(<Self as $crate::element::FacetView>::FACET, method)
            }
        }
    };
}

mod patterns;
mod scroll;
mod types;

pub use patterns::{Editable, Expandable, Selectable, SelectionContainer, Toggle, Transformable};
pub use scroll::{Orientation, ScrollBar};
pub use types::{Menu, MenuItem, Window, WindowState};

/// How long [`MenuItem::open_menu`] and context menus wait for a menu.
pub(crate) const MENU_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub const fn wire_name(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Middle => "middle",
            MouseButton::Right => "right",
        }
    }
}

impl From<MouseButton> for Value {
    fn from(button: MouseButton) -> Self {
        Value::from(button.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Desktop,
    Remote(RemoteObject),
}

struct ElementInner {
    session: Session,
    target: Target,
    control_type: Option<ControlType>,
    patterns: RwLock<BTreeSet<ControlPattern>>,
}

/// A remote UI element, or the desktop that roots the tree.
///
/// Cloning is cheap; clones share the live pattern set.
#[derive(Clone)]
pub struct Element {
    inner: Arc<ElementInner>,
}

fn control_type_of(remote: &RemoteObject) -> Option<ControlType> {
    let name = remote.property("controlType")?.as_str()?;
    let found = capability::control_type(name);
    if found.is_none() {
        warn!("Unknown control type '{}' on element {}", name, remote.uuid());
    }
    found
}

fn patterns_of(remote: &RemoteObject) -> BTreeSet<ControlPattern> {
    let Some(names) = remote.property("controlPatterns").and_then(Value::as_list) else {
        return BTreeSet::new();
    };
    names
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|name| {
            let found = capability::control_pattern(name);
            if found.is_none() {
                warn!("Ignoring unknown control pattern '{}' on element {}", name, remote.uuid());
            }
            found
        })
        .collect()
}

pub(crate) fn no_such_element(message: impl Into<String>) -> TwinError {
    TwinError::Remote(RemoteError::new(ErrorCode::NoSuchElement, message))
}

pub(crate) fn expect_bool(value: Value) -> Result<bool, TwinError> {
    value.as_bool().ok_or_else(|| TwinError::WrongResponseShape {
        expected: "boolean",
        found: value.kind().to_string(),
    })
}

pub(crate) fn expect_optional_string(value: Value) -> Result<Option<String>, TwinError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(TwinError::WrongResponseShape {
            expected: "string",
            found: other.kind().to_string(),
        }),
    }
}

/// Escape text so the keyboard endpoint types it literally.
///
/// `+^%~(){}[]` are wrapped in braces; newline becomes Enter (`~`), tab
/// becomes `{TAB}` and backspace `{BS}`. Carriage returns are dropped.
pub fn escape_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '+' | '^' | '%' | '~' | '(' | ')' | '{' | '}' | '[' | ']' => {
                out.push('{');
                out.push(c);
                out.push('}');
            }
            '\n' => out.push('~'),
            '\t' => out.push_str("{TAB}"),
            '\u{8}' => out.push_str("{BS}"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Where a search looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Children,
    Descendants,
}

impl Scope {
    fn path(self) -> &'static str {
        match self {
            Scope::Children => "children",
            Scope::Descendants => "descendants",
        }
    }
}

impl Element {
    pub(crate) fn desktop(session: Session) -> Self {
        Self::build(
            session,
            Target::Desktop,
            Some(ControlType::Desktop),
            BTreeSet::new(),
        )
    }

    fn build(
        session: Session,
        target: Target,
        control_type: Option<ControlType>,
        patterns: BTreeSet<ControlPattern>,
    ) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                session,
                target,
                control_type,
                patterns: RwLock::new(patterns),
            }),
        }
    }

    /// Wrap a remote reference decoded by `session`.
    ///
    /// Unknown control types and patterns are ignored, leaving an element
    /// with fewer facets rather than an error.
    pub fn from_remote(session: &Session, remote: RemoteObject) -> Result<Self, TwinError> {
        if remote.session() != session.key() {
            return Err(TwinError::InvalidArgument(format!(
                "element {} belongs to another session",
                remote.uuid()
            )));
        }
        let control_type = control_type_of(&remote);
        let patterns = patterns_of(&remote);
        Ok(Self::build(
            session.clone(),
            Target::Remote(remote),
            control_type,
            patterns,
        ))
    }

    /// Wrap a decoded response value that should be a remote reference.
    pub(crate) fn from_value(session: &Session, value: Value) -> Result<Self, TwinError> {
        match value.downcast_ref::<RemoteObject>() {
            Some(remote) => Self::from_remote(session, remote.clone()),
            None => Err(TwinError::WrongResponseShape {
                expected: "element reference",
                found: value.kind().to_string(),
            }),
        }
    }

    pub(crate) fn optional_from_value(
        session: &Session,
        value: Value,
    ) -> Result<Option<Self>, TwinError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_value(session, value).map(Some)
        }
    }

    pub(crate) fn list_from_value(session: &Session, value: Value) -> Result<Vec<Self>, TwinError> {
        expect_array(value)?
            .into_iter()
            .map(|item| Self::from_value(session, item))
            .collect()
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn is_desktop(&self) -> bool {
        self.inner.target == Target::Desktop
    }

    /// The remote reference; `None` for the desktop.
    pub fn remote(&self) -> Option<&RemoteObject> {
        match &self.inner.target {
            Target::Remote(remote) => Some(remote),
            Target::Desktop => None,
        }
    }

    pub fn uuid(&self) -> Option<&str> {
        self.remote().map(RemoteObject::uuid)
    }

    /// `None` when the server reported a type this client doesn't know.
    pub fn control_type(&self) -> Option<ControlType> {
        self.inner.control_type
    }

    /// The pattern set as last reported by the server.
    pub fn control_patterns(&self) -> Vec<ControlPattern> {
        self.inner
            .patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// The name delivered with the reference, without asking the server.
    pub fn cached_name(&self) -> Option<&str> {
        self.remote()?.property("name")?.as_str()
    }

    /// True if `facet` is this element's control type or one of the
    /// patterns it currently exposes.
    pub fn is(&self, facet: impl Into<Facet>) -> bool {
        match facet.into() {
            Facet::Type(t) => self.inner.control_type == Some(t),
            Facet::Pattern(p) => self
                .inner
                .patterns
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&p),
        }
    }

    /// View this element through a facet it currently exposes.
    pub fn view<V: FacetView>(&self) -> Result<V, TwinError> {
        self.clone().into_view()
    }

    pub fn into_view<V: FacetView>(self) -> Result<V, TwinError> {
        if self.is(V::FACET) {
            Ok(V::wrap(self))
        } else {
            Err(TwinError::capability(V::FACET))
        }
    }

    pub(crate) fn check_method(&self, facet: Facet, method: &'static str) -> Result<(), TwinError> {
        capability::check_method(facet, method, |f| self.is(f))
    }

    /// Request path of this element, optionally extended by `suffix`.
    pub(crate) fn path(&self, suffix: &str) -> String {
        let base = match &self.inner.target {
            Target::Desktop => "desktop".to_string(),
            Target::Remote(remote) => format!("element/{}", remote.uuid()),
        };
        if suffix.is_empty() {
            base
        } else {
            format!("{}/{}", base, suffix)
        }
    }

    pub(crate) fn call(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Map>,
        caller: &Location<'_>,
    ) -> Result<Value, TwinError> {
        let body = body.map(Value::Map);
        self.inner
            .session
            .request_at(method, &self.path(suffix), body.as_ref(), caller)
    }

    /// Re-read the element and replace its pattern set with the server's.
    #[track_caller]
    pub fn refresh(&self) -> Result<(), TwinError> {
        if self.is_desktop() {
            return Ok(());
        }
        let remote = self.fetch(Location::caller())?;
        *self
            .inner
            .patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner) = patterns_of(&remote);
        Ok(())
    }

    fn fetch(&self, caller: &Location<'_>) -> Result<RemoteObject, TwinError> {
        let value = self.call(Method::Get, "", None, caller)?;
        value
            .downcast_ref::<RemoteObject>()
            .cloned()
            .ok_or_else(|| TwinError::WrongResponseShape {
                expected: "element reference",
                found: value.kind().to_string(),
            })
    }

    fn fetched_property(&self, key: &str, caller: &Location<'_>) -> Result<Option<String>, TwinError> {
        if self.is_desktop() {
            return Ok(None);
        }
        let remote = self.fetch(caller)?;
        Ok(remote.property(key).and_then(Value::as_str).map(str::to_string))
    }

    #[track_caller]
    pub fn name(&self) -> Result<Option<String>, TwinError> {
        expect_optional_string(self.call(Method::Get, "name", None, Location::caller())?)
    }

    /// Automation id, read fresh from the server.
    #[track_caller]
    pub fn id(&self) -> Result<Option<String>, TwinError> {
        self.fetched_property("id", Location::caller())
    }

    #[track_caller]
    pub fn class_name(&self) -> Result<Option<String>, TwinError> {
        self.fetched_property("className", Location::caller())
    }

    #[track_caller]
    pub fn is_enabled(&self) -> Result<bool, TwinError> {
        expect_bool(self.call(Method::Get, "enabled", None, Location::caller())?)
    }

    #[track_caller]
    pub fn bounds(&self) -> Result<Rect, TwinError> {
        Rect::from_value(&self.call(Method::Get, "bounds", None, Location::caller())?)
    }

    #[track_caller]
    pub fn size(&self) -> Result<Size, TwinError> {
        self.bounds().map(|b| b.size())
    }

    #[track_caller]
    pub fn location(&self) -> Result<Point, TwinError> {
        self.bounds().map(|b| b.location())
    }

    /// `None` at the top of the tree.
    #[track_caller]
    pub fn parent(&self) -> Result<Option<Element>, TwinError> {
        if self.is_desktop() {
            return Ok(None);
        }
        let value = self.call(Method::Get, "parent", None, Location::caller())?;
        Element::optional_from_value(self.session(), value)
    }

    #[track_caller]
    pub fn exists(&self) -> Result<bool, TwinError> {
        self.exists_at(Location::caller())
    }

    fn exists_at(&self, caller: &Location<'_>) -> Result<bool, TwinError> {
        expect_bool(self.call(Method::Get, "exists", None, caller)?)
    }

    /// Text dump of the subtree, as rendered by the server.
    #[track_caller]
    pub fn structure(&self, verbose: bool) -> Result<String, TwinError> {
        let body = object([("verbose", verbose)]);
        match self.call(Method::Get, "structure", Some(body), Location::caller())? {
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    fn click_at_with(
        &self,
        button: Option<MouseButton>,
        at: Option<Point>,
        caller: &Location<'_>,
    ) -> Result<(), TwinError> {
        let mut body = Map::new();
        if let Some(button) = button {
            body.insert("button".to_string(), button.into());
        }
        if let Some(at) = at {
            body.insert("x".to_string(), at.x.into());
            body.insert("y".to_string(), at.y.into());
        }
        self.call(Method::Post, "click", Some(body), caller)?;
        Ok(())
    }

    #[track_caller]
    pub fn click(&self) -> Result<(), TwinError> {
        self.click_at_with(None, None, Location::caller())
    }

    #[track_caller]
    pub fn click_button(&self, button: MouseButton) -> Result<(), TwinError> {
        self.click_at_with(Some(button), None, Location::caller())
    }

    /// Click at a point relative to the element's top-left corner.
    #[track_caller]
    pub fn click_at(&self, x: i32, y: i32, button: Option<MouseButton>) -> Result<(), TwinError> {
        self.click_at_with(button, Some(Point::new(x, y)), Location::caller())
    }

    /// Send raw key sequences, metacharacters included.
    #[track_caller]
    pub fn send_keys(&self, keys: &str) -> Result<(), TwinError> {
        self.send_keys_at(keys, Location::caller())
    }

    fn send_keys_at(&self, keys: &str, caller: &Location<'_>) -> Result<(), TwinError> {
        self.call(Method::Post, "keyboard", Some(object([("keys", keys)])), caller)?;
        Ok(())
    }

    /// Type `text` literally.
    #[track_caller]
    pub fn type_text(&self, text: &str) -> Result<(), TwinError> {
        self.send_keys_at(&escape_keys(text), Location::caller())
    }

    /// Give this element keyboard focus.
    #[track_caller]
    pub fn focus(&self) -> Result<(), TwinError> {
        let Some(remote) = self.remote() else {
            return Err(TwinError::InvalidArgument(
                "the desktop cannot take focus".to_string(),
            ));
        };
        let body = object([("focusedElement", Value::custom(remote.clone()))]);
        self.session().request_at(
            Method::Post,
            "element/active",
            Some(&Value::Map(body)),
            Location::caller(),
        )?;
        Ok(())
    }

    fn search(
        &self,
        scope: Scope,
        criteria: Option<&Criteria>,
        count: Option<usize>,
        caller: &Location<'_>,
    ) -> Result<Vec<Element>, TwinError> {
        let mut body = Map::new();
        if let Some(criteria) = criteria {
            body.insert("criteria".to_string(), criteria.to_json());
        }
        if let Some(count) = count {
            body.insert("count".to_string(), count.into());
        }
        let body = (!body.is_empty()).then_some(body);
        let value = self.call(Method::Get, scope.path(), body, caller)?;
        Element::list_from_value(self.session(), value)
    }

    fn exactly_one(
        &self,
        scope: Scope,
        criteria: &Criteria,
        mut found: Vec<Element>,
    ) -> Result<Element, TwinError> {
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(self.nothing_found(scope, criteria)),
            count => Err(TwinError::MultipleMatches { count }),
        }
    }

    fn nothing_found(&self, scope: Scope, criteria: &Criteria) -> TwinError {
        no_such_element(format!(
            "No {} of {} matching {}",
            match scope {
                Scope::Children => "child",
                Scope::Descendants => "descendant",
            },
            self.path(""),
            criteria
        ))
    }

    /// Direct children, optionally filtered.
    #[track_caller]
    pub fn children(&self, criteria: Option<&Criteria>) -> Result<Vec<Element>, TwinError> {
        self.search(Scope::Children, criteria, None, Location::caller())
    }

    /// All descendants, optionally filtered.
    #[track_caller]
    pub fn descendants(&self, criteria: Option<&Criteria>) -> Result<Vec<Element>, TwinError> {
        self.search(Scope::Descendants, criteria, None, Location::caller())
    }

    /// The single child matching `criteria`.
    #[track_caller]
    pub fn child(&self, criteria: &Criteria) -> Result<Element, TwinError> {
        let found = self.search(Scope::Children, Some(criteria), None, Location::caller())?;
        self.exactly_one(Scope::Children, criteria, found)
    }

    /// The single descendant matching `criteria`.
    #[track_caller]
    pub fn descendant(&self, criteria: &Criteria) -> Result<Element, TwinError> {
        let found = self.search(Scope::Descendants, Some(criteria), None, Location::caller())?;
        self.exactly_one(Scope::Descendants, criteria, found)
    }

    /// Matching descendants at the shallowest depth that has any.
    #[track_caller]
    pub fn closest_descendants(&self, criteria: &Criteria) -> Result<Vec<Element>, TwinError> {
        self.search(Scope::Descendants, Some(criteria), Some(1), Location::caller())
    }

    fn wait_for_one(
        &self,
        scope: Scope,
        criteria: &Criteria,
        timeout: Timeout,
        caller: &Location<'_>,
    ) -> Result<Element, TwinError> {
        let found = poll(timeout, || {
            let mut found = self.search(scope, Some(criteria), None, caller)?;
            match found.len() {
                0 => Ok(None),
                1 => Ok(Some(found.remove(0))),
                count => Err(TwinError::MultipleMatches { count }),
            }
        })?;
        found.ok_or_else(|| self.nothing_found(scope, criteria))
    }

    /// Wait for exactly one child to match.
    #[track_caller]
    pub fn wait_for_child(&self, criteria: &Criteria, timeout: Timeout) -> Result<Element, TwinError> {
        self.wait_for_one(Scope::Children, criteria, timeout, Location::caller())
    }

    /// Wait for exactly one descendant to match.
    #[track_caller]
    pub fn wait_for_descendant(
        &self,
        criteria: &Criteria,
        timeout: Timeout,
    ) -> Result<Element, TwinError> {
        self.wait_for_one(Scope::Descendants, criteria, timeout, Location::caller())
    }

    /// Wait until [`closest_descendants`](Self::closest_descendants) finds
    /// something.
    #[track_caller]
    pub fn wait_for_closest_descendants(
        &self,
        criteria: &Criteria,
        timeout: Timeout,
    ) -> Result<Vec<Element>, TwinError> {
        let caller = Location::caller();
        let found = poll(timeout, || {
            let found = self.search(Scope::Descendants, Some(criteria), Some(1), caller)?;
            Ok((!found.is_empty()).then_some(found))
        })?;
        found.ok_or_else(|| self.nothing_found(Scope::Descendants, criteria))
    }

    /// Wait for the element to disappear.
    #[track_caller]
    pub fn wait_for_not_exists(&self, timeout: Timeout) -> Result<(), TwinError> {
        let caller = Location::caller();
        let gone = poll(timeout, || Ok((!self.exists_at(caller)?).then_some(())))?;
        gone.ok_or_else(|| {
            TwinError::Remote(RemoteError::new(
                ErrorCode::InvalidElementState,
                format!("{} still exists after {}", self.path(""), timeout),
            ))
        })
    }

    /// Capture of this element as it appears on screen.
    #[track_caller]
    pub fn screenshot(&self) -> Result<Screenshot, TwinError> {
        let value = self.call(Method::Get, "screenshot", None, Location::caller())?;
        Screenshot::from_wire(&expect_object(value)?)
    }

    /// Capture of a region, relative to this element.
    #[track_caller]
    pub fn screenshot_of(&self, bounds: Rect) -> Result<Screenshot, TwinError> {
        let value = self.call(
            Method::Get,
            "screenshot",
            Some(bounds.to_map()),
            Location::caller(),
        )?;
        Screenshot::from_wire(&expect_object(value)?)
    }

    /// Capture of the desktop area this element covers, including anything
    /// drawn over it.
    #[track_caller]
    pub fn bounds_screenshot(&self) -> Result<Screenshot, TwinError> {
        let bounds = self.bounds()?;
        self.session().desktop().screenshot_of(bounds)
    }

    #[track_caller]
    pub fn scroll_bar(&self, orientation: Orientation) -> Result<ScrollBar, TwinError> {
        let value = self.call(
            Method::Get,
            orientation.axis_path(),
            None,
            Location::caller(),
        )?;
        match value.downcast_ref::<RemoteObject>() {
            Some(remote) => Ok(ScrollBar::new(self.session().clone(), remote.clone(), orientation)),
            None if value.is_null() => Err(no_such_element(format!(
                "{} has no {} scroll bar",
                self.path(""),
                orientation
            ))),
            None => Err(TwinError::WrongResponseShape {
                expected: "scroll bar reference",
                found: value.kind().to_string(),
            }),
        }
    }

    #[track_caller]
    pub fn vertical_scroll_bar(&self) -> Result<ScrollBar, TwinError> {
        self.scroll_bar(Orientation::Vertical)
    }

    #[track_caller]
    pub fn horizontal_scroll_bar(&self) -> Result<ScrollBar, TwinError> {
        self.scroll_bar(Orientation::Horizontal)
    }

    /// Right-click and return the menu that opens.
    #[track_caller]
    pub fn context_menu(&self) -> Result<Menu, TwinError> {
        self.click_button(MouseButton::Right)?;
        self.opened_menu()
    }

    /// Right-click at a point and return the menu that opens.
    #[track_caller]
    pub fn context_menu_at(&self, x: i32, y: i32) -> Result<Menu, TwinError> {
        self.click_at(x, y, Some(MouseButton::Right))?;
        self.opened_menu()
    }

    #[track_caller]
    fn opened_menu(&self) -> Result<Menu, TwinError> {
        self.session()
            .open_menu()?
            .ok_or_else(|| no_such_element(format!("No context menu opened for {}", self.path(""))))
    }

    /// The nearest button descendant called `name`.
    #[track_caller]
    pub fn button(&self, name: &str) -> Result<Element, TwinError> {
        let criteria = criteria::of_type(ControlType::Button).and(criteria::name(name));
        self.closest_descendants(&criteria)?
            .into_iter()
            .next()
            .ok_or_else(|| self.nothing_found(Scope::Descendants, &criteria))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.session.key() == other.inner.session.key()
            && self.inner.target == other.inner.target
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.session.key().hash(state);
        self.inner.target.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Element");
        match &self.inner.target {
            Target::Desktop => s.field("target", &"desktop"),
            Target::Remote(remote) => s.field("uuid", &remote.uuid()),
        };
        s.field("control_type", &self.inner.control_type)
            .field("patterns", &self.control_patterns())
            .finish()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .control_type()
            .map_or("Element", ControlType::wire_name);
        match (self.uuid(), self.cached_name()) {
            (None, _) => f.write_str("Desktop"),
            (Some(uuid), Some(name)) => write!(f, "{} \"{}\" [{}]", kind, name, uuid),
            (Some(uuid), None) => write!(f, "{} [{}]", kind, uuid),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_facets_from_wire() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "TreeItem", &["expand", "select", "bogus"]);
        assert_eq!(element.control_type(), Some(ControlType::TreeItem));
        assert_eq!(
            element.control_patterns(),
            [ControlPattern::Expandable, ControlPattern::Selectable]
        );
        assert!(element.is(ControlType::TreeItem));
        assert!(element.is(ControlPattern::Expandable));
        assert!(!element.is(ControlPattern::Editable));
        assert!(!element.is(ControlType::Window));
        assert_eq!(element.cached_name(), Some("n-e1"));
    }

    #[test]
    fn test_unknown_control_type_is_opaque() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "Hologram", &["toggle"]);
        assert_eq!(element.control_type(), None);
        assert!(element.is(ControlPattern::Toggle));
    }

    #[test]
    fn test_view_requires_live_pattern() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "Edit", &[]);
        let count = mock.request_count();
        let err = element.view::<Editable>().unwrap_err();
        assert!(matches!(
            err,
            TwinError::CapabilityNotSupported { facet: Facet::Pattern(ControlPattern::Editable), .. }
        ));
        assert_eq!(mock.request_count(), count);
    }

    #[test]
    fn test_refresh_replaces_patterns() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "TreeItem", &["expand"]);
        let expandable = element.view::<Expandable>().unwrap();

        mock.ok(&element_json("e1", "TreeItem", &[]));
        element.refresh().unwrap();
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/element/e1");
        assert!(!element.is(ControlPattern::Expandable));

        let count = mock.request_count();
        let err = expandable.is_expanded().unwrap_err();
        assert!(matches!(err, TwinError::CapabilityNotSupported { method: Some("is_expanded"), .. }));
        assert_eq!(mock.request_count(), count);
    }

    #[test]
    fn test_desktop_paths() {
        let mock = MockTransport::new();
        let desktop = session(&mock).desktop();
        mock.ok(r#"{"x":0,"y":0,"width":1920,"height":1080}"#);
        assert_eq!(desktop.bounds().unwrap(), Rect::new(0, 0, 1920, 1080));
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/desktop/bounds");
        assert!(desktop.is(ControlType::Desktop));
        assert!(desktop.control_patterns().is_empty());
        assert!(desktop.parent().unwrap().is_none());
    }

    #[test]
    fn test_children_body() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok(&format!("[{}]", element_json("w1", "Window", &["transform"])));
        let windows = session
            .desktop()
            .children(Some(&criteria::of_type(ControlType::Window)))
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].uuid(), Some("w1"));
        let request = mock.last();
        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"criteria":{"type":"property","name":"controlType","value":"Window"}}"#)
        );

        mock.ok("[]");
        session.desktop().children(None).unwrap();
        assert_eq!(mock.last().body, None);
    }

    #[test]
    fn test_child_requires_exactly_one() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let desktop = session.desktop();
        let by_name = criteria::name("OK");

        mock.ok("[]");
        let err = desktop.child(&by_name).unwrap_err();
        assert!(err.is_no_such_element());

        mock.ok(&format!(
            "[{},{}]",
            element_json("a", "Button", &[]),
            element_json("b", "Button", &[])
        ));
        let err = desktop.descendant(&by_name).unwrap_err();
        assert!(matches!(err, TwinError::MultipleMatches { count: 2 }));
    }

    #[test]
    fn test_closest_descendants_sends_count() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok("[]");
        session
            .desktop()
            .closest_descendants(&criteria::name("x"))
            .unwrap();
        assert_eq!(
            mock.last().body.as_deref(),
            Some(r#"{"criteria":{"type":"property","name":"name","value":"x"},"count":1}"#)
        );
    }

    #[test]
    fn test_wait_for_child_polls() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok("[]").ok("[]");
        mock.ok(&format!("[{}]", element_json("w1", "Window", &[])));
        let found = session
            .desktop()
            .wait_for_child(&criteria::of_type(ControlType::Window), Timeout::INFINITE)
            .unwrap();
        assert_eq!(found.uuid(), Some("w1"));
        assert_eq!(mock.request_count(), 3);
    }

    #[test]
    fn test_wait_for_descendant_polls() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok("[]");
        mock.ok(&format!("[{}]", element_json("b1", "Button", &[])));
        let found = session
            .desktop()
            .wait_for_descendant(&criteria::name("OK"), Timeout::INFINITE)
            .unwrap();
        assert_eq!(found.uuid(), Some("b1"));
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/desktop/descendants");
        assert_eq!(
            mock.last().body.as_deref(),
            Some(r#"{"criteria":{"type":"property","name":"name","value":"OK"}}"#)
        );
    }

    #[test]
    fn test_wait_for_descendant_rejects_many() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok(&format!(
            "[{},{}]",
            element_json("b1", "Button", &[]),
            element_json("b2", "Button", &[])
        ));
        let err = session
            .desktop()
            .wait_for_descendant(&criteria::name("OK"), Timeout::INFINITE)
            .unwrap_err();
        assert!(matches!(err, TwinError::MultipleMatches { count: 2 }));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_wait_for_closest_descendants_polls() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok("[]").ok("[]");
        mock.ok(&format!(
            "[{},{}]",
            element_json("i1", "ListItem", &["select"]),
            element_json("i2", "ListItem", &["select"])
        ));
        let found = session
            .desktop()
            .wait_for_closest_descendants(
                &criteria::of_type(ControlType::ListItem),
                Timeout::INFINITE,
            )
            .unwrap();
        let uuids: Vec<_> = found.iter().filter_map(Element::uuid).collect();
        assert_eq!(uuids, ["i1", "i2"]);
        assert_eq!(mock.request_count(), 3);
        let expected = concat!(
            r#"{"criteria":{"type":"property","name":"controlType","value":"ListItem"},"#,
            r#""count":1}"#
        );
        for request in mock.requests() {
            assert_eq!(request.body.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_wait_for_closest_descendants_expires() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok("[]");
        let err = session
            .desktop()
            .wait_for_closest_descendants(&criteria::name("x"), Timeout::ZERO)
            .unwrap_err();
        assert!(err.is_no_such_element());
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_wait_with_zero_timeout_tries_once() {
        let mock = MockTransport::new();
        let session = session(&mock);
        mock.ok("[]");
        let err = session
            .desktop()
            .wait_for_descendant(&criteria::name("x"), Timeout::ZERO)
            .unwrap_err();
        assert!(err.is_no_such_element());
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_wait_for_not_exists() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "Window", &[]);
        mock.ok("true").ok("false");
        element.wait_for_not_exists(Timeout::INFINITE).unwrap();

        mock.ok("true");
        let err = element.wait_for_not_exists(Timeout::ZERO).unwrap_err();
        assert_eq!(err.remote_code(), Some(ErrorCode::InvalidElementState));
    }

    #[test]
    fn test_click_and_keys() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "Button", &[]);

        mock.ok("null");
        element.click().unwrap();
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/element/e1/click");
        assert_eq!(mock.last().body.as_deref(), Some("{}"));

        mock.ok("null");
        element.click_at(3, 4, Some(MouseButton::Right)).unwrap();
        assert_eq!(
            mock.last().body.as_deref(),
            Some(r#"{"button":"right","x":3,"y":4}"#)
        );

        mock.ok("null");
        element.type_text("a+b\n").unwrap();
        assert_eq!(mock.last().body.as_deref(), Some(r#"{"keys":"a{+}b~"}"#));
    }

    #[test]
    fn test_escape_keys() {
        assert_eq!(escape_keys("(x)^%{[]}"), "{(}x{)}{^}{%}{{}{[}{]}{}}");
        assert_eq!(escape_keys("a\tb\u{8}\r\n"), "a{TAB}b{BS}~");
        assert_eq!(escape_keys("plain text"), "plain text");
    }

    #[test]
    fn test_focus_sends_reference() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "Edit", &["edit"]);
        mock.ok("null");
        element.focus().unwrap();
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/element/active");
        assert_eq!(
            mock.last().body.as_deref(),
            Some(r#"{"focusedElement":{"class":"Element","uuid":"e1"}}"#)
        );
        assert!(session.desktop().focus().is_err());
    }

    #[test]
    fn test_scroll_bar_missing() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let element = fetch_element(&mock, &session, "ListControl", &[]);
        mock.ok("null");
        let err = element.vertical_scroll_bar().unwrap_err();
        assert!(err.is_no_such_element());
        assert_eq!(mock.last().url, "http://rc:4444/session/s1/element/e1/axisY");
    }

    #[test]
    fn test_equality_by_session_and_uuid() {
        let mock = MockTransport::new();
        let session = session(&mock);
        let a = fetch_element(&mock, &session, "Button", &[]);
        let b = fetch_element(&mock, &session, "Button", &["toggle"]);
        assert_eq!(a, b);
        assert_eq!(session.desktop(), session.desktop());
        assert_ne!(a, session.desktop());

        let other = super::test_support::session(&mock);
        assert_ne!(session.desktop(), other.desktop());
    }

    #[test]
    fn test_foreign_remote_rejected() {
        let mock = MockTransport::new();
        let a = session(&mock);
        let b = session(&mock);
        let element = fetch_element(&mock, &a, "Button", &[]);
        let remote = element.remote().unwrap().clone();
        assert!(matches!(
            Element::from_remote(&b, remote),
            Err(TwinError::InvalidArgument(_))
        ));
    }
}
