use multihash::{Code, MultihashDigest};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashlinkError {
    #[error("hashlink is missing the `hl:` scheme")]
    MissingScheme,

    #[error("hashlink hash part is empty")]
    EmptyHash,

    #[error("hashlink metadata part failed to decode: {0}")]
    InvalidMetadata(String),
}

/// `hl:<multihash-base>[:<metadata-base>]` (§4.A, §6.5).
///
/// Equality and hashing only ever consider `hash_part`: the metadata suffix
/// carries alternate-location hints and two hashlinks referring to the same
/// content but different mirrors must still compare equal.
#[derive(Debug, Clone)]
pub struct Hashlink {
    pub hash_part: String,
    pub metadata_part: Option<String>,
}

impl Hashlink {
    /// Build a hashlink from the raw content it anchors, hashing with SHA-256
    /// and multibase-encoding (base64url, prefix `u`) as the opaque part.
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Code::Sha2_256.digest(content);
        let hash_part = multibase::encode(multibase::Base::Base64Url, digest.to_bytes());
        Self {
            hash_part,
            metadata_part: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata_part = Some(metadata.into());
        self
    }

    pub fn parse(uri: &str) -> Result<Self, HashlinkError> {
        let rest = uri.strip_prefix("hl:").ok_or(HashlinkError::MissingScheme)?;
        let mut parts = rest.splitn(2, ':');
        let hash_part = parts.next().unwrap_or("").to_string();
        if hash_part.is_empty() {
            return Err(HashlinkError::EmptyHash);
        }
        let metadata_part = parts.next().map(|s| s.to_string());
        Ok(Self {
            hash_part,
            metadata_part,
        })
    }
}

impl fmt::Display for Hashlink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.metadata_part {
            Some(meta) => write!(f, "hl:{}:{}", self.hash_part, meta),
            None => write!(f, "hl:{}", self.hash_part),
        }
    }
}

impl PartialEq for Hashlink {
    fn eq(&self, other: &Self) -> bool {
        self.hash_part == other.hash_part
    }
}

impl Eq for Hashlink {}
