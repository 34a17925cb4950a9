use anchor_vocab::Activity;

/// The outbox topic's single tagged envelope type (§4.C.2). Dispatch is a
/// plain `match`, not callback-based control flow.
#[derive(Debug, Clone)]
pub enum OutboxMessage {
    /// Fan out to all recipient IRIs derived from `activity.to`.
    Broadcast { activity: Activity, exclude_iris: Vec<String> },
    /// Re-attempt inbox resolution for one target after a transient failure.
    ResolveAndDeliver { activity: Activity, target_iri: String, exclude_iris: Vec<String> },
    /// Perform the HTTP POST to one inbox.
    Deliver { activity: Activity, target_iri: String },
}
