//! Configuration payload handed to the daemon.
//!
//! Pure data: the supervisor never interprets it.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A configuration message for one daemon component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPayload {
    /// Type identifier of the configuration.
    pub type_url: String,
    /// Filesystem path to the configuration, if it lives on disk.
    #[serde(default)]
    pub path: String,
    /// Inline configuration bytes. Only used when `path` is empty.
    #[serde(default)]
    pub data: Vec<u8>,
}

/// Where a payload's configuration actually comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource<'a> {
    /// Read from this file.
    Path(&'a Path),
    /// Use these bytes.
    Inline(&'a [u8]),
}

impl ConfigPayload {
    /// Payload pointing at a file.
    #[must_use]
    pub fn from_path(type_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            type_url: type_url.into(),
            path: path.into(),
            data: Vec::new(),
        }
    }

    /// Payload carrying inline bytes.
    #[must_use]
    pub fn inline(type_url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            type_url: type_url.into(),
            path: String::new(),
            data: data.into(),
        }
    }

    /// The path wins whenever it is set.
    #[must_use]
    pub fn source(&self) -> PayloadSource<'_> {
        if self.path.is_empty() {
            PayloadSource::Inline(&self.data)
        } else {
            PayloadSource::Path(Path::new(&self.path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_takes_precedence_over_data() {
        let payload = ConfigPayload {
            type_url: "example.Config".into(),
            path: "/etc/daemon/config.toml".into(),
            data: b"ignored".to_vec(),
        };
        assert_eq!(
            payload.source(),
            PayloadSource::Path(Path::new("/etc/daemon/config.toml"))
        );
    }

    #[test]
    fn test_inline_when_path_empty() {
        let payload = ConfigPayload::inline("example.Config", b"version = 2".to_vec());
        assert_eq!(payload.source(), PayloadSource::Inline(b"version = 2"));
    }

    #[test]
    fn test_json_defaults() {
        let payload: ConfigPayload =
            serde_json::from_str(r#"{"type_url":"example.Config"}"#).unwrap();
        assert_eq!(payload.source(), PayloadSource::Inline(&[]));
    }
}
