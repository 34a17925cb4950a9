//! Outbox delivery and Inbox receipt (§4.C, §4.D): broadcasting activities
//! to resolved recipient inboxes, and authenticating/dispatching activities
//! received on this node's inbox.

mod activity_store;
mod directory;
mod error;
mod inbox;
mod iri_cache;
mod lifecycle;
mod message;
mod outbox;

pub use activity_store::{ActivityStore, ReferenceKind};
pub use directory::{ActorDirectory, HttpActorDirectory};
pub use error::{FederationError, FederationResult};
pub use inbox::{
    default_max_body_bytes, default_subscriber_pool_size, router, run_subscriber_pool, ActivityHandler,
    InboxState, TokenManager,
};
pub use iri_cache::IriResolutionCache;
pub use lifecycle::{ComponentState, Lifecycle};
pub use message::OutboxMessage;
pub use outbox::{Outbox, OutboxConfig, UndeliverableHandler};
