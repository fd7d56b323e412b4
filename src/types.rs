//! Core types shared by the remote client and the flow controller

use crate::error::{BgRemovalError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// MIME type assumed when the service does not tell us what it returned
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// An image encoded as a self-describing `data:<mime>;base64,<payload>` string
///
/// Values are only ever built from a complete byte buffer or a complete,
/// well-formed data URI, so the MIME type is always present and the payload
/// always decodes.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageDataUri {
    mime_type: String,
    payload: String,
}

impl ImageDataUri {
    /// Encode raw bytes under the given MIME type
    ///
    /// # Errors
    /// - `mime_type` is not of the form `type/subtype`
    /// - `bytes` is empty
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self> {
        let mime_type = normalize_mime(mime_type)?;
        if bytes.is_empty() {
            return Err(BgRemovalError::invalid_data_uri("image payload is empty"));
        }

        Ok(Self {
            mime_type,
            payload: BASE64.encode(bytes),
        })
    }

    /// MIME type carried by this image
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without the `data:` header
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// True when the MIME type names an image
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Decode the payload back into raw bytes
    ///
    /// # Errors
    /// Returns `InvalidDataUri` if the payload is not valid base64
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.payload.as_bytes())
            .map_err(|e| BgRemovalError::invalid_data_uri(format!("payload is not base64: {e}")))
    }

    /// Size of the decoded payload in bytes, computed without decoding
    #[must_use]
    pub fn decoded_len(&self) -> usize {
        let padding = self.payload.bytes().rev().take_while(|b| *b == b'=').count();
        (self.payload.len() / 4) * 3 - padding
    }
}

/// Validate `type/subtype` and lowercase it
fn normalize_mime(mime_type: &str) -> Result<String> {
    let mime_type = mime_type.trim();
    if is_mime_type(mime_type) {
        Ok(mime_type.to_ascii_lowercase())
    } else {
        Err(BgRemovalError::invalid_data_uri(format!(
            "'{mime_type}' is not a MIME type"
        )))
    }
}

/// Whether `value` has the `type/subtype` shape
pub(crate) fn is_mime_type(value: &str) -> bool {
    value
        .split_once('/')
        .is_some_and(|(kind, subtype)| is_mime_token(kind) && is_mime_token(subtype))
}

fn is_mime_token(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
}

impl FromStr for ImageDataUri {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(DATA_PREFIX)
            .ok_or_else(|| BgRemovalError::invalid_data_uri("missing 'data:' prefix"))?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| BgRemovalError::invalid_data_uri("only base64 data URIs are supported"))?;

        let mime_type = normalize_mime(mime_type)?;
        if payload.is_empty() {
            return Err(BgRemovalError::invalid_data_uri("image payload is empty"));
        }
        BASE64
            .decode(payload.as_bytes())
            .map_err(|e| BgRemovalError::invalid_data_uri(format!("payload is not base64: {e}")))?;

        Ok(Self {
            mime_type,
            payload: payload.to_string(),
        })
    }
}

impl fmt::Display for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DATA_PREFIX}{}{BASE64_MARKER}{}", self.mime_type, self.payload)
    }
}

// Payloads can be megabytes long; keep them out of logs.
impl fmt::Debug for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDataUri")
            .field("mime_type", &self.mime_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl Serialize for ImageDataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImageDataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Suffix appended to the original file stem for downloads
pub const DOWNLOAD_SUFFIX: &str = "_nobg";

/// Extension of every download; the service is always asked for PNG
pub const DOWNLOAD_EXTENSION: &str = "png";

/// A processed image ready to be saved by the user
#[derive(Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Name a download after the uploaded file: `photo.jpg` becomes `photo_nobg.png`
///
/// Only the last extension is stripped, so `.png` becomes `_nobg.png`.
#[must_use]
pub fn download_file_name(original: &str) -> String {
    let stem = original
        .rsplit_once('.')
        .map_or(original, |(stem, _extension)| stem);
    format!("{stem}{DOWNLOAD_SUFFIX}.{DOWNLOAD_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_renders_data_uri() {
        let uri = ImageDataUri::from_bytes("image/jpeg", b"hello").unwrap();
        assert_eq!(uri.to_string(), "data:image/jpeg;base64,aGVsbG8=");
        assert_eq!(uri.mime_type(), "image/jpeg");
        assert_eq!(uri.decoded_len(), 5);
        assert!(uri.is_image());
    }

    #[test]
    fn test_parse_keeps_mime_and_payload() {
        let uri: ImageDataUri = "data:Image/PNG;base64,iVBORw0KGgo=".parse().unwrap();
        assert_eq!(uri.mime_type(), "image/png");
        assert_eq!(uri.payload(), "iVBORw0KGgo=");
        assert_eq!(uri.decode().unwrap(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_rejects_partial_uris() {
        for raw in [
            "image/png;base64,AAAA",
            "data:;base64,AAAA",
            "data:image/png,AAAA",
            "data:image/png;base64,",
            "data:image/png;base64,@@@@",
            "data:image;base64,AAAA",
            "data:image/png;charset=x;base64,AAAA",
        ] {
            assert!(raw.parse::<ImageDataUri>().is_err(), "accepted {raw}");
        }
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        assert!(ImageDataUri::from_bytes("image/png", &[]).is_err());
        assert!(ImageDataUri::from_bytes("png", b"x").is_err());
        assert!(ImageDataUri::from_bytes("image/png; q=1", b"x").is_err());
        assert!(ImageDataUri::from_bytes("image/png/extra", b"x").is_err());
    }

    #[test]
    fn test_debug_hides_payload() {
        let uri = ImageDataUri::from_bytes("image/png", &[7u8; 64]).unwrap();
        let debug = format!("{uri:?}");
        assert!(debug.contains("image/png"));
        assert!(!debug.contains(uri.payload()));
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name("photo.jpg"), "photo_nobg.png");
        assert_eq!(download_file_name("holiday.final.PNG"), "holiday.final_nobg.png");
        assert_eq!(download_file_name("scan"), "scan_nobg.png");
        assert_eq!(download_file_name(".png"), "_nobg.png");
        assert_eq!(download_file_name(""), "_nobg.png");
    }

    #[test]
    fn test_serde_uses_string_form() {
        let uri = ImageDataUri::from_bytes("image/webp", b"abc").unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"data:image/webp;base64,YWJj\"");
        let back: ImageDataUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
        assert!(serde_json::from_str::<ImageDataUri>("\"not a uri\"").is_err());
    }
}
