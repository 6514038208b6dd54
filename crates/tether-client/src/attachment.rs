//! Files uploaded to the server.

use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tether_core::error::TwinError;
use tether_core::json::{object, Value};
use tether_core::protocol::Method;
use tether_core::remote::RemoteObject;

use crate::session::Session;

pub(crate) fn encode_contents(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// A file held by the server, created with [`Session::upload`].
///
/// After [`delete`](Self::delete) every method fails locally.
#[derive(Debug)]
pub struct Attachment {
    session: Session,
    remote: RemoteObject,
    path: Option<String>,
    deleted: AtomicBool,
}

impl Attachment {
    pub(crate) fn from_value(session: &Session, value: Value) -> Result<Self, TwinError> {
        let remote = value
            .downcast_ref::<RemoteObject>()
            .cloned()
            .ok_or_else(|| TwinError::WrongResponseShape {
                expected: "attachment reference",
                found: value.kind().to_string(),
            })?;
        let path = remote
            .property("path")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            session: session.clone(),
            remote,
            path,
            deleted: AtomicBool::new(false),
        })
    }

    fn ensure_live(&self) -> Result<(), TwinError> {
        if self.deleted.load(Ordering::Acquire) {
            Err(TwinError::invalid_state(format!(
                "attachment {} was deleted",
                self.remote.uuid()
            )))
        } else {
            Ok(())
        }
    }

    fn request_path(&self) -> String {
        format!("attachment/{}", self.remote.uuid())
    }

    pub fn uuid(&self) -> &str {
        self.remote.uuid()
    }

    /// Where the file lives on the server's machine.
    pub fn path(&self) -> Result<&str, TwinError> {
        self.ensure_live()?;
        self.path.as_deref().ok_or_else(|| TwinError::WrongResponseShape {
            expected: "attachment path",
            found: "nothing".to_string(),
        })
    }

    /// Replace the file's contents.
    #[track_caller]
    pub fn set_contents(&self, data: &[u8]) -> Result<(), TwinError> {
        self.ensure_live()?;
        let body = Value::Map(object([("data", encode_contents(data))]));
        self.session.request_at(
            Method::Post,
            &self.request_path(),
            Some(&body),
            Location::caller(),
        )?;
        Ok(())
    }

    /// Remove the file from the server.
    #[track_caller]
    pub fn delete(&self) -> Result<(), TwinError> {
        self.ensure_live()?;
        self.session.request_at(
            Method::Delete,
            &self.request_path(),
            None,
            Location::caller(),
        )?;
        self.deleted.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }
}
