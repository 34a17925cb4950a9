use serde::{Deserialize, Serialize};

/// A DID (`href`) and optional prior anchor hashlink establishing a per-DID
/// chain (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl Item {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }
}
