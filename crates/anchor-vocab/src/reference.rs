use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use flate2::read::GzDecoder;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

use crate::linkset::Linkset;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("unrecognized data-uri media type: {0}")]
    UnrecognizedMediaType(String),

    #[error("malformed data uri")]
    MalformedDataUri,

    #[error("percent-decoding failed: {0}")]
    PercentDecodeFailed(String),

    #[error("base64 decoding failed: {0}")]
    Base64Failed(String),

    #[error("gzip decompression failed: {0}")]
    GzipFailed(String),

    #[error("content is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reference type is not application/linkset+json")]
    NotALinkset,
}

/// A `(href, content-type)` pair (§3, §6.4). `href` is frequently a `data:`
/// URI carrying inline gzip+base64 or percent-encoded JSON content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub href: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl Reference {
    pub fn new(href: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            content_type: content_type.into(),
        }
    }

    /// Decode the referenced content, recognizing `application/json`
    /// (percent-encoded) and `application/gzip;base64` data URIs.
    pub fn content(&self) -> Result<Vec<u8>, ReferenceError> {
        let body = self
            .href
            .strip_prefix("data:")
            .ok_or(ReferenceError::MalformedDataUri)?;
        let (media_type, payload) = body
            .split_once(',')
            .ok_or(ReferenceError::MalformedDataUri)?;

        match media_type {
            "application/json" => percent_decode_str(payload)
                .decode_utf8()
                .map(|s| s.into_owned().into_bytes())
                .map_err(|e| ReferenceError::PercentDecodeFailed(e.to_string())),
            "application/gzip;base64" => {
                let compressed = Base64
                    .decode(payload)
                    .map_err(|e| ReferenceError::Base64Failed(e.to_string()))?;
                let mut decoder = GzDecoder::new(&compressed[..]);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| ReferenceError::GzipFailed(e.to_string()))?;
                Ok(out)
            }
            other => Err(ReferenceError::UnrecognizedMediaType(other.to_string())),
        }
    }

    /// Parse the decoded content as a `Linkset`, iff this reference declares
    /// `application/linkset+json`.
    pub fn linkset(&self) -> Result<Linkset, ReferenceError> {
        if self.content_type != "application/linkset+json" {
            return Err(ReferenceError::NotALinkset);
        }
        let bytes = self.content()?;
        serde_json::from_slice(&bytes).map_err(|e| ReferenceError::InvalidJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_encoded_json() {
        let r = Reference::new("data:application/json,%7B%22a%22%3A1%7D", "application/json");
        assert_eq!(r.content().unwrap(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn decodes_gzip_base64() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello gzip").unwrap();
        let compressed = encoder.finish().unwrap();
        let encoded = Base64.encode(compressed);
        let r = Reference::new(
            format!("data:application/gzip;base64,{encoded}"),
            "application/gzip;base64",
        );
        assert_eq!(r.content().unwrap(), b"hello gzip".to_vec());
    }

    #[test]
    fn rejects_unknown_media_type() {
        let r = Reference::new("data:text/plain,hi", "text/plain");
        assert!(matches!(
            r.content(),
            Err(ReferenceError::UnrecognizedMediaType(_))
        ));
    }
}
