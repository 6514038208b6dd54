//! Core types and logic for tether.
//!
//! This crate holds the parts of the UI automation protocol that need no
//! network access: the JSON codec, remote object identity, search criteria,
//! the facet registry and error reconstruction. The `tether-client` crate
//! builds sessions and element proxies on top of it.
//!
//! # Modules
//!
//! - [`json`]: JSON codec with recognizers for richer decoded values
//! - [`remote`]: References to server-owned objects
//! - [`criteria`]: Predicate trees for element searches
//! - [`capability`]: Control types, control patterns and method requirements
//! - [`error`]: Status codes and the client error type
//! - [`exception`]: Rebuilding server exceptions, with cause chains
//! - [`protocol`]: Response envelope and path conventions
//!
//! # Facets
//!
//! An element has one control type, fixed when it is found, and a set of
//! control patterns that can change between calls:
//!
//! | Facet | Example | Can change |
//! |-------|---------|------------|
//! | **Control type** | `Button`, `Window`, `TreeItem` | No |
//! | **Control pattern** | `edit`, `expand`, `toggle` | Yes |

pub mod capability;
pub mod criteria;
pub mod error;
pub mod exception;
pub mod json;
pub mod protocol;
pub mod remote;
