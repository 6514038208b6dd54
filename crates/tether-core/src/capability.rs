//! Control types, control patterns and the facet registry.
//!
//! Every remote element has exactly one control type (what it is) and any
//! number of control patterns (what it can currently do). The server names
//! both with short strings; this module maps those names to local
//! identities and back, and records which facets each remote method may be
//! called through.
//!
//! # Wire names
//!
//! | Facet | Wire name |
//! |-------|-----------|
//! | Control types | simple name, e.g. `Button`, `ListControl` |
//! | [`ControlPattern::Editable`] | `edit` |
//! | [`ControlPattern::Expandable`] | `expand` |
//! | [`ControlPattern::Selectable`] | `select` |
//! | [`ControlPattern::SelectionContainer`] | `select-container` |
//! | [`ControlPattern::Toggle`] | `toggle` |
//! | [`ControlPattern::Transformable`] | `transform` |

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::TwinError;
use crate::json::Value;

macro_rules! control_types {
    ($($variant:ident),+ $(,)?) => {
        /// The fixed category of a UI element.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ControlType {
            $($variant,)+
        }

        impl ControlType {
            /// Every known control type.
            pub const ALL: &'static [ControlType] = &[$(ControlType::$variant,)+];

            /// The name the server uses for this type.
            pub const fn wire_name(self) -> &'static str {
                match self {
                    $(ControlType::$variant => stringify!($variant),)+
                }
            }
        }
    };
}

control_types! {
    Button,
    CalendarControl,
    CheckBox,
    ComboBox,
    Custom,
    DataGrid,
    DataItem,
    Desktop,
    Document,
    Edit,
    Group,
    Header,
    HeaderItem,
    Hyperlink,
    Image,
    ListControl,
    ListItem,
    Menu,
    MenuBar,
    MenuItem,
    Pane,
    ProgressBar,
    RadioButton,
    ScrollBarControl,
    Separator,
    Slider,
    Spinner,
    SplitButton,
    StatusBar,
    Tab,
    TabItem,
    Table,
    Text,
    Thumb,
    TitleBar,
    ToolBar,
    ToolTip,
    Tree,
    TreeItem,
    Window,
}

/// An optional behavior an element may support at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControlPattern {
    #[serde(rename = "edit")]
    Editable,
    #[serde(rename = "expand")]
    Expandable,
    #[serde(rename = "select")]
    Selectable,
    #[serde(rename = "select-container")]
    SelectionContainer,
    #[serde(rename = "toggle")]
    Toggle,
    #[serde(rename = "transform")]
    Transformable,
}

impl ControlPattern {
    pub const ALL: &'static [ControlPattern] = &[
        ControlPattern::Editable,
        ControlPattern::Expandable,
        ControlPattern::Selectable,
        ControlPattern::SelectionContainer,
        ControlPattern::Toggle,
        ControlPattern::Transformable,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            ControlPattern::Editable => "edit",
            ControlPattern::Expandable => "expand",
            ControlPattern::Selectable => "select",
            ControlPattern::SelectionContainer => "select-container",
            ControlPattern::Toggle => "toggle",
            ControlPattern::Transformable => "transform",
        }
    }
}

/// Either a control type or a control pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Facet {
    Type(ControlType),
    Pattern(ControlPattern),
}

impl Facet {
    pub const fn wire_name(self) -> &'static str {
        match self {
            Facet::Type(t) => t.wire_name(),
            Facet::Pattern(p) => p.wire_name(),
        }
    }
}

impl From<ControlType> for Facet {
    fn from(t: ControlType) -> Self {
        Facet::Type(t)
    }
}

impl From<ControlPattern> for Facet {
    fn from(p: ControlPattern) -> Self {
        Facet::Pattern(p)
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl fmt::Display for ControlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl From<ControlType> for Value {
    fn from(t: ControlType) -> Self {
        Value::from(t.wire_name())
    }
}

impl From<ControlPattern> for Value {
    fn from(p: ControlPattern) -> Self {
        Value::from(p.wire_name())
    }
}

static TYPES_BY_NAME: LazyLock<HashMap<&'static str, ControlType>> =
    LazyLock::new(|| ControlType::ALL.iter().map(|t| (t.wire_name(), *t)).collect());

static PATTERNS_BY_NAME: LazyLock<HashMap<&'static str, ControlPattern>> = LazyLock::new(|| {
    ControlPattern::ALL
        .iter()
        .map(|p| (p.wire_name(), *p))
        .collect()
});

/// Control type for a server-side name.
pub fn control_type(name: &str) -> Option<ControlType> {
    TYPES_BY_NAME.get(name).copied()
}

/// Control pattern for a server-side name.
pub fn control_pattern(name: &str) -> Option<ControlPattern> {
    PATTERNS_BY_NAME.get(name).copied()
}

/// Resolve a facet by wire name, control types first.
pub fn facet(name: &str) -> Option<Facet> {
    control_type(name)
        .map(Facet::Type)
        .or_else(|| control_pattern(name).map(Facet::Pattern))
}

use ControlPattern as P;
use ControlType as T;

const EDIT: &[Facet] = &[Facet::Pattern(P::Editable)];
const EXPAND: &[Facet] = &[Facet::Pattern(P::Expandable)];
const SELECT: &[Facet] = &[Facet::Pattern(P::Selectable)];
const SELECT_CONTAINER: &[Facet] = &[Facet::Pattern(P::SelectionContainer)];
const TOGGLE: &[Facet] = &[Facet::Pattern(P::Toggle)];
const TRANSFORM: &[Facet] = &[Facet::Pattern(P::Transformable)];
const WINDOW: &[Facet] = &[Facet::Type(T::Window)];
const MENU: &[Facet] = &[Facet::Type(T::Menu)];
const MENU_ITEM: &[Facet] = &[Facet::Type(T::MenuItem)];

/// Which facets each remote method may be invoked through.
const METHOD_REQUIREMENTS: &[(Facet, &str, &[Facet])] = &[
    (Facet::Pattern(P::Editable), "value", EDIT),
    (Facet::Pattern(P::Editable), "set_value", EDIT),
    (Facet::Pattern(P::Editable), "is_read_only", EDIT),
    (Facet::Pattern(P::Expandable), "is_expanded", EXPAND),
    (Facet::Pattern(P::Expandable), "set_expanded", EXPAND),
    (Facet::Pattern(P::Selectable), "is_selected", SELECT),
    (Facet::Pattern(P::Selectable), "set_selected", SELECT),
    (Facet::Pattern(P::Selectable), "container", SELECT),
    (Facet::Pattern(P::SelectionContainer), "is_multiple_selection_allowed", SELECT_CONTAINER),
    (Facet::Pattern(P::SelectionContainer), "is_selection_required", SELECT_CONTAINER),
    (Facet::Pattern(P::SelectionContainer), "selection", SELECT_CONTAINER),
    (Facet::Pattern(P::SelectionContainer), "selected_item", SELECT_CONTAINER),
    (Facet::Pattern(P::Toggle), "state", TOGGLE),
    (Facet::Pattern(P::Toggle), "set_state", TOGGLE),
    (Facet::Pattern(P::Toggle), "toggle", TOGGLE),
    (Facet::Pattern(P::Transformable), "set_size", TRANSFORM),
    (Facet::Pattern(P::Transformable), "set_location", TRANSFORM),
    (Facet::Pattern(P::Transformable), "set_bounds", TRANSFORM),
    (Facet::Type(T::Window), "close", WINDOW),
    (Facet::Type(T::Window), "is_maximized", WINDOW),
    (Facet::Type(T::Window), "is_minimized", WINDOW),
    (Facet::Type(T::Window), "maximize", WINDOW),
    (Facet::Type(T::Window), "minimize", WINDOW),
    (Facet::Type(T::Window), "restore", WINDOW),
    (Facet::Type(T::Window), "menu", WINDOW),
    (Facet::Type(T::Menu), "item", MENU),
    (Facet::Type(T::Menu), "item_at", MENU),
    (Facet::Type(T::MenuItem), "open_menu", MENU_ITEM),
];

static REQUIREMENTS: LazyLock<HashMap<(Facet, &'static str), &'static [Facet]>> =
    LazyLock::new(|| {
        METHOD_REQUIREMENTS
            .iter()
            .map(|(facet, method, required)| ((*facet, *method), *required))
            .collect()
    });

/// Facets through which `method` on `facet` may be invoked.
pub fn required_facets(facet: Facet, method: &str) -> Option<&'static [Facet]> {
    REQUIREMENTS.get(&(facet, method)).copied()
}

/// Verify a tagged method may run given what the element currently exposes.
///
/// Untagged methods pass. Tagged methods need at least one of their facets
/// to be present according to `has`.
pub fn check_method(
    facet: Facet,
    method: &'static str,
    has: impl Fn(Facet) -> bool,
) -> Result<(), TwinError> {
    match required_facets(facet, method) {
        Some(required) if !required.iter().any(|f| has(*f)) => {
            Err(TwinError::CapabilityNotSupported {
                facet,
                method: Some(method),
            })
        }
        _ => Ok(()),
    }
}
