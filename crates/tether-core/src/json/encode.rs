//! JSON text generation.
//!
//! Check order for each value:
//! 1. Custom values are replaced by their `to_json()` form, repeatedly
//! 2. Null
//! 3. Numbers (non-finite doubles become `null`)
//! 4. Booleans
//! 5. Maps, lists and strings
//!
//! Conversions into [`Value`] cover the remaining source shapes (characters,
//! symbolic enums, arrays) before encoding starts.

use std::fmt::{self, Write as _};
use std::io;

use super::{JsonError, Value};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Encode a value to a JSON string.
pub fn encode(value: &Value) -> Result<String, JsonError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

/// Encode a value as UTF-8 onto a byte stream.
pub fn encode_to_writer<W: io::Write>(value: &Value, writer: W) -> Result<(), JsonError> {
    let mut adapter = IoAdapter {
        inner: writer,
        error: None,
    };
    match write_value(value, &mut adapter) {
        Err(JsonError::Format) => Err(adapter
            .error
            .take()
            .map_or(JsonError::Format, JsonError::Io)),
        other => other,
    }
}

/// Bridges `fmt::Write` onto an `io::Write`, remembering the real I/O error.
struct IoAdapter<W> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: io::Write> fmt::Write for IoAdapter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

fn write_value<W: fmt::Write>(value: &Value, out: &mut W) -> Result<(), JsonError> {
    match value {
        Value::Custom(custom) => {
            let replacement = custom.to_json()?;
            write_value(&replacement, out)
        }
        Value::Null => Ok(out.write_str("null")?),
        Value::Int(n) => Ok(write!(out, "{}", n)?),
        Value::Long(n) => Ok(write!(out, "{}", n)?),
        Value::Double(d) => {
            if d.is_finite() {
                // Debug keeps a fractional part or exponent, so the text reads
                // back as a double rather than an integer.
                Ok(write!(out, "{:?}", d)?)
            } else {
                Ok(out.write_str("null")?)
            }
        }
        Value::Bool(b) => Ok(out.write_str(if *b { "true" } else { "false" })?),
        Value::Map(map) => {
            out.write_char('{')?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write_string(key, out)?;
                out.write_char(':')?;
                write_value(item, out)?;
            }
            Ok(out.write_char('}')?)
        }
        Value::List(items) => {
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write_value(item, out)?;
            }
            Ok(out.write_char(']')?)
        }
        Value::String(s) => write_string(s, out),
    }
}

fn write_string<W: fmt::Write>(s: &str, out: &mut W) -> Result<(), JsonError> {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\r' => out.write_str("\\r")?,
            '\n' => out.write_str("\\n")?,
            '\u{8}' => out.write_str("\\b")?,
            '\u{c}' => out.write_str("\\f")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 || (c as u32) >= 0x80 => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units).iter() {
                    write_unicode_escape(*unit, out)?;
                }
            }
            c => out.write_char(c)?,
        }
    }
    Ok(out.write_char('"')?)
}

fn write_unicode_escape<W: fmt::Write>(unit: u16, out: &mut W) -> fmt::Result {
    out.write_str("\\u")?;
    for shift in [12u16, 8, 4, 0] {
        out.write_char(HEX[usize::from((unit >> shift) & 0xf)] as char)?;
    }
    Ok(())
}
