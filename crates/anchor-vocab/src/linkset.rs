use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hashlink::Hashlink;
use crate::item::Item;
use crate::reference::Reference;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("anchor URI is absent")]
    MissingAnchor,

    #[error("anchor URI scheme is not `hl`")]
    WrongScheme,

    #[error("author is absent")]
    MissingAuthor,

    #[error("profile is absent")]
    MissingProfile,

    #[error("original content hash does not match the anchor hash")]
    HashMismatch,

    #[error(transparent)]
    Hashlink(#[from] crate::hashlink::HashlinkError),

    #[error(transparent)]
    Reference(#[from] crate::reference::ReferenceError),
}

/// A bare `{"href": "..."}` slot, used for `author` and `profile` (§6.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrefOnly {
    pub href: String,
}

impl HrefOnly {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// One linkset entry: an anchor hashlink plus up to four single reference
/// slots and a repeated `up` slot (§3, §4.A).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    pub anchor: Option<String>,
    #[serde(default)]
    pub author: Vec<HrefOnly>,
    #[serde(default)]
    pub profile: Vec<HrefOnly>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub up: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<Reference>,
}

impl Link {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: Some(anchor.into()),
            ..Default::default()
        }
    }

    /// §4.A: fails `InvalidAnchor` (here, one of `LinkError`'s variants) if
    /// the anchor is absent or wrongly scoped, author/profile are absent, or
    /// the original reference's content hash doesn't match the anchor.
    pub fn validate(&self) -> Result<(), LinkError> {
        let anchor = self.anchor.as_deref().ok_or(LinkError::MissingAnchor)?;
        if !anchor.starts_with("hl:") {
            return Err(LinkError::WrongScheme);
        }
        if self.author.is_empty() {
            return Err(LinkError::MissingAuthor);
        }
        if self.profile.is_empty() {
            return Err(LinkError::MissingProfile);
        }
        if let Some(original) = &self.original {
            let anchor_hl = Hashlink::parse(anchor)?;
            let content = original.content()?;
            let content_hl = Hashlink::from_content(&content);
            if content_hl.hash_part != anchor_hl.hash_part {
                return Err(LinkError::HashMismatch);
            }
        }
        Ok(())
    }
}

/// The JSON-LD envelope carrying one or more typed links (§6.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Linkset {
    pub linkset: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_link_with_original(content: &[u8]) -> Link {
        let hl = crate::hashlink::Hashlink::from_content(content);
        let mut link = Link::new(hl.to_string());
        link.author.push(HrefOnly::new("https://node.example/actor"));
        link.profile.push(HrefOnly::new("https://w3id.org/orb#v0"));
        link.original = Some(Reference::new(
            format!(
                "data:application/json,{}",
                percent_encoding::percent_encode(
                    content,
                    percent_encoding::NON_ALPHANUMERIC
                )
            ),
            "application/json",
        ));
        link
    }

    #[test]
    fn validate_accepts_matching_hash() {
        let link = valid_link_with_original(br#"{"ok":true}"#);
        link.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_anchor() {
        let link = Link::default();
        assert!(matches!(link.validate(), Err(LinkError::MissingAnchor)));
    }

    #[test]
    fn validate_rejects_wrong_scheme() {
        let mut link = Link::new("https://not-a-hashlink");
        link.author.push(HrefOnly::new("a"));
        link.profile.push(HrefOnly::new("p"));
        assert!(matches!(link.validate(), Err(LinkError::WrongScheme)));
    }

    #[test]
    fn validate_rejects_hash_mismatch() {
        let mut link = valid_link_with_original(br#"{"ok":true}"#);
        link.original = Some(Reference::new(
            "data:application/json,%7B%22different%22%3Atrue%7D",
            "application/json",
        ));
        assert!(matches!(link.validate(), Err(LinkError::HashMismatch)));
    }

    #[test]
    fn linkset_round_trips_through_json() {
        let link = valid_link_with_original(br#"{"a":1}"#);
        let linkset = Linkset {
            linkset: vec![link],
        };
        let json = serde_json::to_string(&linkset).unwrap();
        let back: Linkset = serde_json::from_str(&json).unwrap();
        back.linkset[0].validate().unwrap();
    }
}
