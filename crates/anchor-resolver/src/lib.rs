/*!
# Anchor Resolver

DID document resolution, CID verification against the anchor graph, and
anchor-origin reconciliation across federated nodes (§4.G). WebFinger
discovery (§4.G.4-5) is folded into this crate rather than split out, since
both host-meta and resource lookups serve the same reconciliation path.
*/

#![forbid(unsafe_code)]

mod cid;
mod error;
mod resolver;
mod types;
mod webfinger;

pub use cid::{parse_id, verify_cid, AnchorGraph, ParsedId};
pub use error::{ResolverError, ResolverResult};
pub use resolver::{CreateDocumentStore, DiscoveryScheduler, OperationProcessor, Resolver, ResolverConfig};
pub use types::{DocumentMetadata, ResolutionResult};
pub use webfinger::{DidWebDomainResolver, DomainResolver, WebFingerClient};
