//! `data:<mime>;base64,<payload>`, the one encoding every image crosses
//! the workspace boundary in.
//!
//! Uploads, pastes, generated results, and segmentation masks all arrive as
//! data URIs. Collaborators sometimes hand back a bare base64 payload with
//! no header; [`DataUri::parse_lenient`] accepts that too and assumes PNG.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// MIME type assumed for headerless payloads.
pub const DEFAULT_MIME: &str = "image/png";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a data URI (missing `data:` prefix)")]
    MissingScheme,

    #[error("data URI has no `,` separating header and payload")]
    MissingSeparator,

    #[error("data URI is not base64-encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// A parsed data URI. The payload stays base64 text; decode on demand.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    mime: String,
    payload: String,
}

impl DataUri {
    /// Build a data URI from raw bytes.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self {
            mime: mime.to_string(),
            payload: STANDARD.encode(bytes),
        }
    }

    /// Wrap an already-encoded base64 payload.
    pub fn from_base64(mime: &str, payload: impl Into<String>) -> Self {
        Self {
            mime: mime.to_string(),
            payload: payload.into(),
        }
    }

    /// Parse a strict `data:<mime>;base64,<payload>` string.
    pub fn parse(s: &str) -> Result<Self, DataUriError> {
        let rest = s.trim().strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(DataUriError::NotBase64)?;
        let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
        Ok(Self {
            mime: mime.to_string(),
            payload: payload.to_string(),
        })
    }

    /// Parse a data URI, or treat the whole string as a bare base64 PNG.
    pub fn parse_lenient(s: &str) -> Result<Self, DataUriError> {
        let s = s.trim();
        if s.starts_with("data:") {
            return Self::parse(s);
        }
        if s.is_empty() {
            return Err(DataUriError::InvalidPayload("empty payload".to_string()));
        }
        Ok(Self::from_base64(DEFAULT_MIME, s))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// The base64 payload without header, as model collaborators take.
    pub fn base64(&self) -> &str {
        &self.payload
    }

    /// Decode the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| DataUriError::InvalidPayload(e.to_string()))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.payload)
    }
}

impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads are megabytes; keep logs readable.
        write!(
            f,
            "DataUri({}, {} base64 chars)",
            self.mime,
            self.payload.len()
        )
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DataUri::parse_lenient(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_and_display_roundtrip() {
        let uri = DataUri::parse("data:image/jpeg;base64,AAEC").unwrap();
        assert_eq!(uri.mime(), "image/jpeg");
        assert_eq!(uri.base64(), "AAEC");
        assert_eq!(uri.to_string(), "data:image/jpeg;base64,AAEC");
    }

    #[test]
    fn decode_payload() {
        let uri = DataUri::from_bytes("image/png", &[1, 2, 3, 255]);
        assert_eq!(uri.decode().unwrap(), vec![1, 2, 3, 255]);
    }

    #[test]
    fn rejects_non_base64_header() {
        assert_eq!(
            DataUri::parse("data:text/plain,hello"),
            Err(DataUriError::NotBase64)
        );
        assert_eq!(DataUri::parse("hello"), Err(DataUriError::MissingScheme));
        assert_eq!(
            DataUri::parse("data:image/png;base64"),
            Err(DataUriError::MissingSeparator)
        );
    }

    #[test]
    fn lenient_accepts_bare_payload() {
        let uri = DataUri::parse_lenient("iVBORw0KGgo=").unwrap();
        assert_eq!(uri.mime(), DEFAULT_MIME);
        assert_eq!(uri.base64(), "iVBORw0KGgo=");
    }

    #[test]
    fn invalid_payload_fails_on_decode_only() {
        let uri = DataUri::parse("data:image/png;base64,!!!").unwrap();
        assert!(matches!(uri.decode(), Err(DataUriError::InvalidPayload(_))));
    }

    #[test]
    fn serde_uses_uri_string() {
        let uri = DataUri::from_bytes("image/png", &[7]);
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"data:image/png;base64,Bw==\"");
        let back: DataUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }
}
