use serde::{Deserialize, Serialize};
use std::fmt;

/// An IRI identifying an actor, activity, or other federation resource.
///
/// Kept as an opaque string rather than a parsed `url::Url` because most
/// comparisons in the core (recipient dedup, `to` membership checks) are
/// plain string equality, not URL normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(pub String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
