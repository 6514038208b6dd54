//! JSON codec with a recognizer hook.
//!
//! Decoding offers every finished object to a chain of [`Recognizer`]s,
//! innermost first, so a recognized child is already in place when its
//! parent is inspected. Encoding accepts [`CustomValue`]s and unwraps them
//! until a plain JSON value remains.

mod decode;
mod encode;
mod interop;
mod recognize;
mod value;

use std::fmt;
use std::io;

use thiserror::Error;

pub use decode::{decode, decode_reader};
pub use encode::{encode, encode_to_writer};
pub use recognize::{FromJsonObject, Recognizer, RecognizerTable};
pub use value::{object, CustomValue, Map, Value};

/// Codec failures.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The input text is not valid JSON.
    #[error("malformed JSON at offset {position}: {message}")]
    Malformed { message: String, position: usize },

    /// A value with no JSON form was handed to the encoder.
    #[error("unsupported value of type {type_name}")]
    Unsupported { type_name: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The output sink refused a write.
    #[error("formatting failed")]
    Format,

    /// A recognizer table already holds an entry for this type.
    #[error("recognizer for {type_name} is already registered")]
    DuplicateRecognizer { type_name: &'static str },
}

impl From<fmt::Error> for JsonError {
    fn from(_: fmt::Error) -> Self {
        JsonError::Format
    }
}

impl JsonError {
    pub(crate) fn malformed(message: impl Into<String>, position: usize) -> Self {
        JsonError::Malformed {
            message: message.into(),
            position,
        }
    }
}
