/*!
# Anchor Common

Shared types and error plumbing used by every crate in the DID anchoring node:
the `Iri` newtype, Unix-timestamp helpers, and the `CoreError` kind enum with
its transient/persistent classification. Mirrors the way the teacher crate's
`icn-common`/`icn-identity` layer underpins its domain crates.
*/

#![forbid(unsafe_code)]

pub mod error;
pub mod iri;
pub mod time;

pub use error::{CoreError, CoreResult};
pub use iri::Iri;
pub use time::unix_now;

/// The ActivityPub "Public" collection sentinel (§6.1).
pub const PUBLIC_IRI: &str = "https://www.w3.org/ns/activitystreams#Public";
