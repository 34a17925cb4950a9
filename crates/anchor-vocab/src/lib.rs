/*!
# Anchor Vocab

Component A: the typed JSON-LD activity/link model, and hashlink & data-URI
encoding. Grounded in the teacher's `icn-identity` vocabulary types (plain
`serde`-derived structs, `thiserror` per-module error enums) generalized to
the ActivityPub-flavored wire format this node speaks.
*/

#![forbid(unsafe_code)]

pub mod activity;
pub mod actor;
pub mod hashlink;
pub mod item;
pub mod linkset;
pub mod reference;

pub use activity::{Activity, ActivityKind, ActivityObject};
pub use actor::{Actor, PublicKey};
pub use hashlink::{Hashlink, HashlinkError};
pub use item::Item;
pub use linkset::{HrefOnly, Link, LinkError, Linkset};
pub use reference::{Reference, ReferenceError};
