//! Sessions with the automation server.
//!
//! A [`Session`] moves through three states: unopened, open and closed.
//! There is no way back out of closed. Every session-scoped request needs the
//! open state; calls made in any other state fail locally and never reach the
//! wire.

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tether_core::capability::ControlType;
use tether_core::criteria;
use tether_core::error::{ErrorCode, TwinError};
use tether_core::exception::RemoteError;
use tether_core::json::{object, Map, Value};
use tether_core::protocol::{self, Method};
use tether_core::remote::{remote_object_recognizer, SessionKey};
use tracing::{debug, info};

use crate::attachment::Attachment;
use crate::clipboard::Clipboard;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::element::{Element, Menu, Window, MENU_TIMEOUT};
use crate::screenshot::Screenshot;
use crate::transport::{HttpTransport, Transport};
use crate::wait::Timeout;

#[derive(Debug, Clone)]
enum State {
    Unopened,
    Open {
        id: String,
        capabilities: Map,
        /// `None` for sessions bound with [`Session::attach`].
        opened_at: Option<DateTime<Utc>>,
    },
    Closed,
}

struct SessionInner {
    key: SessionKey,
    connection: Connection,
    state: RwLock<State>,
    desired_capabilities: RwLock<Map>,
    session_setup: RwLock<Map>,
    timeout: RwLock<Timeout>,
}

/// A client-side handle on one server session.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// An unopened session against the server at `url`.
    pub fn new(transport: Arc<dyn Transport>, url: &str) -> Self {
        Self::with_state(transport, url, State::Unopened)
    }

    /// Bind to a session that is already open on the server.
    pub fn attach(
        transport: Arc<dyn Transport>,
        url: &str,
        id: impl Into<String>,
        capabilities: Map,
    ) -> Self {
        let id = id.into();
        debug!("Attaching to session {} at {}", id, url);
        Self::with_state(
            transport,
            url,
            State::Open {
                id,
                capabilities,
                opened_at: None,
            },
        )
    }

    /// Build from resolved configuration. Attaches when the config names a
    /// session; otherwise the result is unopened, with the configured desired
    /// capabilities.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TwinError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.pool)?);
        let session = match &config.session {
            Some(id) => Self::attach(transport, &config.url, id.clone(), Map::new()),
            None => {
                let session = Self::new(transport, &config.url);
                *write(&session.inner.desired_capabilities) = config.desired_capabilities.clone();
                session
            }
        };
        session.set_timeout(config.timeout);
        Ok(session)
    }

    fn with_state(transport: Arc<dyn Transport>, url: &str, state: State) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                key: SessionKey::next(),
                connection: Connection::new(transport, url),
                state: RwLock::new(state),
                desired_capabilities: RwLock::new(Map::new()),
                session_setup: RwLock::new(Map::new()),
                timeout: RwLock::new(Timeout::DEFAULT),
            }),
        }
    }

    /// Scope of the remote objects this session decodes.
    pub fn key(&self) -> SessionKey {
        self.inner.key
    }

    pub fn url(&self) -> &str {
        self.inner.connection.base_url()
    }

    /// Default timeout for waits that don't take one explicitly.
    pub fn timeout(&self) -> Timeout {
        *read(&self.inner.timeout)
    }

    pub fn set_timeout(&self, timeout: Timeout) {
        *write(&self.inner.timeout) = timeout;
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Timeout) -> Self {
        self.set_timeout(timeout);
        self
    }

    fn ensure_unopened(&self, action: &str) -> Result<(), TwinError> {
        match &*read(&self.inner.state) {
            State::Unopened => Ok(()),
            State::Open { .. } => Err(TwinError::invalid_state(format!(
                "cannot {}: session is already open",
                action
            ))),
            State::Closed => Err(TwinError::invalid_state(format!(
                "cannot {}: session is closed",
                action
            ))),
        }
    }

    /// Set a desired capability for the next [`open`](Self::open).
    pub fn set_desired_capability(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&Self, TwinError> {
        self.ensure_unopened("set capabilities")?;
        write(&self.inner.desired_capabilities).insert(name.into(), value.into());
        Ok(self)
    }

    /// Add a session setup entry. A `required` entry also asks the server
    /// to refuse the session when it can't honour it, through the
    /// `sessionSetup.{name}` capability.
    pub fn add_session_setup(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
        required: bool,
    ) -> Result<&Self, TwinError> {
        self.ensure_unopened("add session setup")?;
        let name = name.into();
        if required {
            write(&self.inner.desired_capabilities)
                .insert(format!("sessionSetup.{}", name), Value::Bool(true));
        }
        write(&self.inner.session_setup).insert(name, value.into());
        Ok(self)
    }

    /// Negotiate a new server session.
    #[track_caller]
    pub fn open(&self) -> Result<(), TwinError> {
        let caller = Location::caller();
        // Held across the request: a concurrent open() blocks here, then
        // fails as already open.
        let mut state = write(&self.inner.state);
        match &*state {
            State::Unopened => {}
            State::Open { .. } => return Err(TwinError::invalid_state("session is already open")),
            State::Closed => return Err(TwinError::invalid_state("session is closed")),
        }

        let body = protocol::new_session_body(
            &read(&self.inner.desired_capabilities),
            &read(&self.inner.session_setup),
        );
        let recognizer = remote_object_recognizer(self.inner.key);
        let envelope = self
            .inner
            .connection
            .request(
                Method::Post,
                "/session",
                Some(&Value::Map(body)),
                &[&recognizer],
                caller,
            )?
            .ensure_success(Some(caller))?;

        let (id, capabilities) = match (envelope.session_id(), envelope.value()) {
            (Some(id), Some(Value::Map(capabilities))) => (id.to_string(), capabilities.clone()),
            _ => {
                return Err(TwinError::Remote(RemoteError::new(
                    ErrorCode::UnknownError,
                    format!(
                        "Success response didn't include sessionId or value: {}",
                        Value::Map(envelope.as_map().clone())
                    ),
                )))
            }
        };
        info!("Opened session {} at {}", id, self.url());
        *state = State::Open {
            id,
            capabilities,
            opened_at: Some(Utc::now()),
        };
        Ok(())
    }

    /// Open a session for a named application.
    ///
    /// Sets the `applicationName` and `version` capabilities, then any
    /// others given, then opens.
    #[track_caller]
    pub fn open_application(
        &self,
        name: &str,
        version: Option<&str>,
        other_capabilities: Map,
    ) -> Result<(), TwinError> {
        self.set_desired_capability("applicationName", name)?;
        if let Some(version) = version {
            self.set_desired_capability("version", version)?;
        }
        for (key, value) in other_capabilities {
            self.set_desired_capability(key, value)?;
        }
        self.open()
    }

    /// End the server session.
    ///
    /// Once the server has answered, the session is closed whether or not
    /// the answer was a success. A transport failure leaves it open.
    #[track_caller]
    pub fn close(&self) -> Result<(), TwinError> {
        let caller = Location::caller();
        let id = self.require_open()?;
        let result = self.inner.connection.request(
            Method::Delete,
            &format!("/session/{}", id),
            None,
            &[],
            caller,
        );
        if let Err(TwinError::Transport { .. }) = &result {
            return result.map(|_| ());
        }
        *write(&self.inner.state) = State::Closed;
        info!("Closed session {}", id);
        result?.ensure_success(Some(caller)).map(|_| ())
    }

    fn require_open(&self) -> Result<String, TwinError> {
        match &*read(&self.inner.state) {
            State::Open { id, .. } => Ok(id.clone()),
            State::Unopened => Err(TwinError::invalid_state("session is not open")),
            State::Closed => Err(TwinError::invalid_state("session is closed")),
        }
    }

    /// Send a session-scoped request and return the `value` of the reply.
    ///
    /// `path` is relative to `/session/{id}/`; leading slashes are ignored.
    #[track_caller]
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TwinError> {
        self.request_at(method, path, body, Location::caller())
    }

    /// Like [`request`](Self::request), for replies that must be objects.
    #[track_caller]
    pub fn request_object(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Map, TwinError> {
        expect_object(self.request_at(method, path, body, Location::caller())?)
    }

    /// Like [`request`](Self::request), for replies that must be lists.
    #[track_caller]
    pub fn request_array(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Vec<Value>, TwinError> {
        expect_array(self.request_at(method, path, body, Location::caller())?)
    }

    /// Methods the server allows on a session-scoped path.
    pub fn options(&self, path: &str) -> Result<Vec<String>, TwinError> {
        let id = self.require_open()?;
        self.inner
            .connection
            .options(&protocol::session_path(&id, path))
    }

    pub(crate) fn request_at(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        caller: &Location<'_>,
    ) -> Result<Value, TwinError> {
        let id = self.require_open()?;
        let recognizer = remote_object_recognizer(self.inner.key);
        self.inner
            .connection
            .request(
                method,
                &protocol::session_path(&id, path),
                body,
                &[&recognizer],
                caller,
            )?
            .ensure_success(Some(caller))?
            .into_value()
    }

    pub fn is_open(&self) -> bool {
        matches!(&*read(&self.inner.state), State::Open { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(&*read(&self.inner.state), State::Closed)
    }

    /// Server-assigned session id, while open.
    pub fn id(&self) -> Option<String> {
        match &*read(&self.inner.state) {
            State::Open { id, .. } => Some(id.clone()),
            _ => None,
        }
    }

    /// Capabilities the server agreed to, while open.
    pub fn capabilities(&self) -> Option<Map> {
        match &*read(&self.inner.state) {
            State::Open { capabilities, .. } => Some(capabilities.clone()),
            _ => None,
        }
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        match &*read(&self.inner.state) {
            State::Open { opened_at, .. } => *opened_at,
            _ => None,
        }
    }

    fn capability_string(&self, name: &str) -> Option<String> {
        self.capabilities()?.get(name)?.as_str().map(str::to_string)
    }

    pub fn application_name(&self) -> Option<String> {
        self.capability_string("applicationName")
    }

    pub fn application_version(&self) -> Option<String> {
        self.capability_string("version")
    }

    /// The root of the element tree.
    pub fn desktop(&self) -> Element {
        Element::desktop(self.clone())
    }

    pub fn clipboard(&self) -> Clipboard {
        Clipboard::new(self.clone())
    }

    /// The application's single top-level window, waiting up to the
    /// session timeout for it to appear.
    #[track_caller]
    pub fn window(&self) -> Result<Window, TwinError> {
        let element = self
            .desktop()
            .wait_for_child(&criteria::of_type(ControlType::Window), self.timeout())?;
        Window::try_from(element)
    }

    /// Every top-level window.
    #[track_caller]
    pub fn windows(&self) -> Result<Vec<Window>, TwinError> {
        self.desktop()
            .children(Some(&criteria::of_type(ControlType::Window)))?
            .into_iter()
            .map(Window::try_from)
            .collect()
    }

    /// The currently open menu, if one shows up within a second.
    #[track_caller]
    pub fn open_menu(&self) -> Result<Option<Menu>, TwinError> {
        let found = self.desktop().wait_for_descendant(
            &criteria::of_type(ControlType::Menu),
            Timeout::from_duration(MENU_TIMEOUT),
        );
        match found {
            Ok(element) => Menu::try_from(element).map(Some),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up an element by uuid.
    #[track_caller]
    pub fn element(&self, uuid: &str) -> Result<Element, TwinError> {
        let path = format!("element/{}", uuid);
        let value = self.request_at(Method::Get, &path, None, Location::caller())?;
        Element::from_value(self, value)
    }

    /// The element that has keyboard focus.
    #[track_caller]
    pub fn focused_element(&self) -> Result<Element, TwinError> {
        let value = self.request_at(Method::Get, "element/active", None, Location::caller())?;
        Element::from_value(self, value)
    }

    /// A capture of the whole desktop.
    #[track_caller]
    pub fn screenshot(&self) -> Result<Screenshot, TwinError> {
        self.desktop().screenshot()
    }

    /// Store `data` on the server, optionally under a file name.
    #[track_caller]
    pub fn upload(&self, data: &[u8], name: Option<&str>) -> Result<Attachment, TwinError> {
        let mut body = object([("data", crate::attachment::encode_contents(data))]);
        if let Some(name) = name {
            body.insert("name".to_string(), Value::from(name));
        }
        let value = self.request_at(
            Method::Post,
            "attachment",
            Some(&Value::Map(body)),
            Location::caller(),
        )?;
        Attachment::from_value(self, value)
    }
}

pub(crate) fn expect_object(value: Value) -> Result<Map, TwinError> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(TwinError::WrongResponseShape {
            expected: "object",
            found: other.kind().to_string(),
        }),
    }
}

pub(crate) fn expect_array(value: Value) -> Result<Vec<Value>, TwinError> {
    match value {
        Value::List(list) => Ok(list),
        other => Err(TwinError::WrongResponseShape {
            expected: "list",
            found: other.kind().to_string(),
        }),
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.inner.key)
            .field("url", &self.url())
            .field("state", &*read(&self.inner.state))
            .finish()
    }
}
