use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use anchor_common::PUBLIC_IRI;

/// §3: the tagged union of federation message kinds this node understands.
/// Matched with a single `match` by the inbox dispatcher (§9) rather than
/// open trait-object polymorphism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Create,
    Announce,
    Follow,
    Undo,
    Offer,
    Accept,
    Reject,
    Like,
}

/// `object` is polymorphic: a bare IRI, a nested activity (e.g. the `Follow`
/// an `Undo` targets), or an embedded object value (e.g. an anchor Linkset).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityObject {
    Iri(String),
    Activity(Box<Activity>),
    Embedded(serde_json::Value),
}

impl ActivityObject {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            ActivityObject::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// One or many IRIs on the wire, normalized to a `Vec` once parsed (§6.1:
/// `to` is "URI or array").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(iri) => vec![iri],
            OneOrMany::Many(iris) => iris,
        }
    }
}

fn default_context() -> serde_json::Value {
    serde_json::json!("https://www.w3.org/ns/activitystreams")
}

fn deserialize_to<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: OneOrMany = Deserialize::deserialize(deserializer)?;
    Ok(value.into())
}

/// A federation activity (§3, §6.1): `Create`, `Announce`, `Follow`, `Undo`,
/// `Offer`, `Accept`, `Reject`, or `Like`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "@context", default = "default_context")]
    pub context: serde_json::Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub kind: ActivityKind,

    pub actor: String,

    #[serde(default, deserialize_with = "deserialize_to")]
    pub to: Vec<String>,

    pub object: ActivityObject,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl Activity {
    pub fn new(kind: ActivityKind, actor: impl Into<String>, object: ActivityObject) -> Self {
        Self {
            context: default_context(),
            id: None,
            kind,
            actor: actor.into(),
            to: Vec::new(),
            object,
            published: Some(Utc::now()),
        }
    }

    pub fn with_to(mut self, to: Vec<String>) -> Self {
        self.to = to;
        self
    }

    pub fn to_public(mut self) -> Self {
        if !self.to.iter().any(|iri| iri == PUBLIC_IRI) {
            self.to.push(PUBLIC_IRI.to_string());
        }
        self
    }

    /// Populate `id` if absent, deriving it from the owning actor's IRI
    /// (§4.C.1: "populates id if absent").
    pub fn ensure_id(&mut self, base_actor_iri: &str) -> &str {
        if self.id.is_none() {
            self.id = Some(format!("{base_actor_iri}/activities/{}", Uuid::new_v4()));
        }
        self.id.as_deref().expect("id just set")
    }

    /// §3: outbound activities must carry the local service IRI as `actor`.
    pub fn actor_matches(&self, service_iri: &str) -> bool {
        self.actor == service_iri
    }

    pub fn addresses_public(&self) -> bool {
        self.to.iter().any(|iri| iri == PUBLIC_IRI)
    }
}
