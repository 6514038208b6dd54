//! Screen captures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tether_core::error::TwinError;
use tether_core::json::{Map, Value};

/// Image bytes with their MIME type. The bytes are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    data: Vec<u8>,
    content_type: String,
}

impl Screenshot {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
        }
    }

    /// Read `{contentType, data}` with base64 data.
    pub(crate) fn from_wire(map: &Map) -> Result<Self, TwinError> {
        let text = |key: &'static str| {
            map.get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| TwinError::WrongResponseShape {
                    expected: "screenshot with contentType and data",
                    found: format!("no '{}'", key),
                })
        };
        let content_type = text("contentType")?;
        let data = STANDARD.decode(text("data")?).map_err(|e| {
            TwinError::WrongResponseShape {
                expected: "base64 image data",
                found: e.to_string(),
            }
        })?;
        Ok(Self::new(data, content_type))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// File extension for the MIME type, for the types the server produces.
    pub fn extension(&self) -> Option<&'static str> {
        let content_type = self.content_type.as_str();
        if content_type.eq_ignore_ascii_case("image/png") {
            Some("png")
        } else if content_type.eq_ignore_ascii_case("image/jpeg") {
            Some("jpg")
        } else if content_type.eq_ignore_ascii_case("image/gif") {
            Some("gif")
        } else {
            None
        }
    }

    /// Write the image bytes to `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.data)
    }

    /// Write to `dir/{basename}.{extension}` and return the path.
    pub fn save_as(&self, dir: &Path, basename: &str) -> io::Result<PathBuf> {
        let extension = self.extension().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown content type {}", self.content_type),
            )
        })?;
        let path = dir.join(format!("{}.{}", basename, extension));
        self.save(&path)?;
        Ok(path)
    }

    /// Write into `dir` under a random name.
    pub fn save_in(&self, dir: &Path) -> io::Result<PathBuf> {
        self.save_as(dir, &uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::json;

    #[test]
    fn test_from_wire() {
        let map = json::object([("contentType", "image/png"), ("data", "iVBORw==")]);
        let shot = Screenshot::from_wire(&map).unwrap();
        assert_eq!(shot.content_type(), "image/png");
        assert_eq!(shot.data(), &[0x89, b'P', b'N', b'G']);
        assert_eq!(shot.extension(), Some("png"));
    }

    #[test]
    fn test_bad_wire_data() {
        let map = json::object([("contentType", "image/png"), ("data", "***")]);
        assert!(Screenshot::from_wire(&map).is_err());
        let map = json::object([("data", "AAAA")]);
        assert!(Screenshot::from_wire(&map).is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(Screenshot::new(vec![], "IMAGE/JPEG").extension(), Some("jpg"));
        assert_eq!(Screenshot::new(vec![], "image/gif").extension(), Some("gif"));
        assert_eq!(Screenshot::new(vec![], "image/bmp").extension(), None);
    }

    #[test]
    fn test_save_in_uses_random_name() {
        let dir = std::env::temp_dir();
        let shot = Screenshot::new(vec![1, 2, 3], "image/png");
        let first = shot.save_in(&dir).unwrap();
        let second = shot.save_in(&dir).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(fs::read(&first).unwrap(), vec![1, 2, 3]);
        let _ = fs::remove_file(first);
        let _ = fs::remove_file(second);
    }

    #[test]
    fn test_save_in_unknown_type() {
        let shot = Screenshot::new(vec![0], "image/tiff");
        let err = shot.save_in(&std::env::temp_dir()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
