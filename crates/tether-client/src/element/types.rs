//! Control type views with behavior of their own.

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tether_core::capability::{ControlType, Facet};
use tether_core::criteria;
use tether_core::error::TwinError;
use tether_core::json::{object, Value};
use tether_core::protocol::Method;

use super::{expect_optional_string, no_such_element, Element, Transformable, MENU_TIMEOUT};
use crate::wait::Timeout;

facet_view! {
    /// A top-level window.
    Window => Facet::Type(ControlType::Window)
}

facet_view! {
    Menu => Facet::Type(ControlType::Menu)
}

facet_view! {
    MenuItem => Facet::Type(ControlType::MenuItem)
}

/// Window display state. Parsing ignores case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowState {
    Normal,
    Maximized,
    Minimized,
}

impl WindowState {
    pub const fn wire_name(self) -> &'static str {
        match self {
            WindowState::Normal => "Normal",
            WindowState::Maximized => "Maximized",
            WindowState::Minimized => "Minimized",
        }
    }
}

impl FromStr for WindowState {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            WindowState::Normal,
            WindowState::Maximized,
            WindowState::Minimized,
        ]
        .into_iter()
        .find(|state| state.wire_name().eq_ignore_ascii_case(s))
        .ok_or_else(|| TwinError::InvalidArgument(format!("unknown window state '{}'", s)))
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl From<WindowState> for Value {
    fn from(state: WindowState) -> Self {
        Value::from(state.wire_name())
    }
}

impl Window {
    /// Close the window.
    #[track_caller]
    pub fn close(&self) -> Result<(), TwinError> {
        self.check("close")?;
        self.call(Method::Delete, "", None, Location::caller())?;
        Ok(())
    }

    fn state_at(&self, method: &'static str, caller: &Location<'_>) -> Result<WindowState, TwinError> {
        self.check(method)?;
        let value = self.call(Method::Get, "window-state", None, caller)?;
        match expect_optional_string(value)? {
            Some(name) => name.parse(),
            None => Ok(WindowState::Normal),
        }
    }

    fn set_state_at(
        &self,
        method: &'static str,
        state: WindowState,
        caller: &Location<'_>,
    ) -> Result<(), TwinError> {
        self.check(method)?;
        self.call(
            Method::Post,
            "window-state",
            Some(object([("state", state)])),
            caller,
        )?;
        Ok(())
    }

    #[track_caller]
    pub fn is_maximized(&self) -> Result<bool, TwinError> {
        Ok(self.state_at("is_maximized", Location::caller())? == WindowState::Maximized)
    }

    #[track_caller]
    pub fn is_minimized(&self) -> Result<bool, TwinError> {
        Ok(self.state_at("is_minimized", Location::caller())? == WindowState::Minimized)
    }

    #[track_caller]
    pub fn maximize(&self) -> Result<(), TwinError> {
        self.set_state_at("maximize", WindowState::Maximized, Location::caller())
    }

    #[track_caller]
    pub fn minimize(&self) -> Result<(), TwinError> {
        self.set_state_at("minimize", WindowState::Minimized, Location::caller())
    }

    #[track_caller]
    pub fn restore(&self) -> Result<(), TwinError> {
        self.set_state_at("restore", WindowState::Normal, Location::caller())
    }

    /// The top-level menu bar entry called `name`.
    #[track_caller]
    pub fn menu(&self, name: &str) -> Result<MenuItem, TwinError> {
        self.check("menu")?;
        let bar = self.descendant(&criteria::of_type(ControlType::MenuBar))?;
        let item = bar.child(&criteria::of_type(ControlType::MenuItem).and(criteria::name(name)))?;
        MenuItem::try_from(item)
    }

    /// This window as something that can be moved and resized, when the
    /// server says it can be.
    pub fn transform(&self) -> Result<Transformable, TwinError> {
        self.view()
    }
}

impl Menu {
    /// The item called `name`.
    #[track_caller]
    pub fn item(&self, name: &str) -> Result<MenuItem, TwinError> {
        self.check("item")?;
        let item = self.child(&criteria::of_type(ControlType::MenuItem).and(criteria::name(name)))?;
        MenuItem::try_from(item)
    }

    /// The item at `index`, counting from zero.
    #[track_caller]
    pub fn item_at(&self, index: usize) -> Result<MenuItem, TwinError> {
        self.check("item_at")?;
        let items = self.children(Some(&criteria::of_type(ControlType::MenuItem)))?;
        let count = items.len();
        let item = items.into_iter().nth(index).ok_or_else(|| {
            no_such_element(format!("menu has {} items, no item at {}", count, index))
        })?;
        MenuItem::try_from(item)
    }
}

impl MenuItem {
    /// Click the item and return the submenu it opens.
    #[track_caller]
    pub fn open_menu(&self) -> Result<Menu, TwinError> {
        self.check("open_menu")?;
        self.click()?;
        let menu: Element = self.wait_for_child(
            &criteria::of_type(ControlType::Menu),
            Timeout::from_duration(MENU_TIMEOUT),
        )?;
        Menu::try_from(menu)
    }
}
