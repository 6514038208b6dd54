//! Blocking client for driving remote UI element trees.
//!
//! A [`Session`] talks to an automation server over JSON/HTTP. Elements
//! found through it are live proxies: each call is a request, and facet
//! checks run locally before anything is sent.
//!
//! ```no_run
//! use tether_client::element::Editable;
//! use tether_client::{criteria, HttpTransport, Session, Timeout};
//! use tether_core::capability::ControlPattern;
//!
//! # fn main() -> Result<(), tether_core::error::TwinError> {
//! let session = Session::new(HttpTransport::shared()?, "http://localhost:4444/");
//! session.open_application("notepad", None, Default::default())?;
//!
//! let window = session.window()?;
//! let text = window
//!     .wait_for_descendant(&criteria::of_type(ControlPattern::Editable), Timeout::DEFAULT)?
//!     .into_view::<Editable>()?;
//! text.set_value("hello")?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`session`]: Session lifecycle and session-scoped requests
//! - [`element`]: Element proxies and facet views
//! - [`connection`]: Response interpretation for one server endpoint
//! - [`transport`]: The HTTP seam and the pooled `reqwest` transport
//! - [`config`]: Settings from flags, environment and config file
//! - [`wait`]: Timeouts and client-side polling

pub mod attachment;
pub mod clipboard;
pub mod config;
pub mod connection;
pub mod element;
pub mod geometry;
pub mod screenshot;
pub mod session;
pub mod transport;
pub mod wait;

pub use attachment::Attachment;
pub use clipboard::Clipboard;
pub use config::ClientConfig;
pub use element::{Element, MouseButton};
pub use geometry::{Point, Rect, Size};
pub use screenshot::Screenshot;
pub use session::Session;
pub use tether_core::criteria;
pub use transport::{HttpTransport, Transport};
pub use wait::Timeout;
