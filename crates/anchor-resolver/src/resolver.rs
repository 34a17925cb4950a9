use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cid::{parse_id, verify_cid, AnchorGraph};
use crate::error::{ResolverError, ResolverResult};
use crate::types::ResolutionResult;
use crate::webfinger::{DomainResolver, WebFingerClient};

/// Resolves a DID's current state from its operation log (§4.G.1). The
/// concrete Sidetree/orb-style operation application is out of this crate's
/// scope; this trait fixes the interface the resolver drives.
#[async_trait]
pub trait OperationProcessor: Send + Sync {
    async fn resolve(&self, id: &str) -> ResolverResult<ResolutionResult>;

    /// Re-resolves `id` with `extra_operations` folded into the chain ahead
    /// of local state (§4.G.2's "re-runs local resolution with the extra
    /// operations applied").
    async fn resolve_with_operations(&self, id: &str, extra_operations: &[Value]) -> ResolverResult<ResolutionResult>;
}

/// Looks up a not-yet-anchored DID by its unpublished label (§4.G.1 step 2).
#[async_trait]
pub trait CreateDocumentStore: Send + Sync {
    async fn lookup_unpublished(&self, label: &str) -> ResolverResult<Option<String>>;
}

/// Fire-and-forget hook scheduling an async discovery attempt for a
/// not-found published id (§4.G.1's "schedule an async discovery request").
pub trait DiscoveryScheduler: Send + Sync {
    fn schedule(&self, id: &str);
}

/// Configuration toggles for the resolver (§4.G.2, §4.G.4).
pub struct ResolverConfig {
    pub local_domain: String,
    pub anchor_origin_reconciliation_enabled: bool,
    pub discovery_enabled: bool,
    pub resolution_media_type: String,
}

/// Ties together local resolution, CID verification, and anchor-origin
/// reconciliation (§4.G.1-3).
pub struct Resolver<P, C, G> {
    processor: Arc<P>,
    create_store: Option<Arc<C>>,
    graph: Arc<G>,
    discovery: Option<Arc<dyn DiscoveryScheduler>>,
    webfinger: Option<Arc<WebFingerClient>>,
    domain_resolver: Arc<dyn DomainResolver>,
    http: reqwest::Client,
    config: ResolverConfig,
}

impl<P, C, G> Resolver<P, C, G>
where
    P: OperationProcessor,
    C: CreateDocumentStore,
    G: AnchorGraph,
{
    pub fn new(
        processor: Arc<P>,
        create_store: Option<Arc<C>>,
        graph: Arc<G>,
        discovery: Option<Arc<dyn DiscoveryScheduler>>,
        webfinger: Option<Arc<WebFingerClient>>,
        domain_resolver: Arc<dyn DomainResolver>,
        http: reqwest::Client,
        config: ResolverConfig,
    ) -> Self {
        Self {
            processor,
            create_store,
            graph,
            discovery,
            webfinger,
            domain_resolver,
            http,
            config,
        }
    }

    /// §4.G.1: resolve `id` to its current document, falling back to the
    /// create-document store for unpublished labels and triggering async
    /// discovery for published-but-missing ids.
    pub async fn resolve_document(&self, id: &str) -> ResolverResult<ResolutionResult> {
        let parsed = parse_id(id);

        let result = match self.processor.resolve(id).await {
            Ok(result) => result,
            Err(err) if is_not_found(&err) => {
                if parsed.is_err() {
                    let substituted = self.substitute_unpublished(id).await?;
                    return Box::pin(self.resolve_document(&substituted)).await;
                }
                if self.config.discovery_enabled {
                    if let Some(scheduler) = &self.discovery {
                        scheduler.schedule(id);
                    }
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if result.metadata.published {
            if let Ok(parsed_id) = &parsed {
                if let Some(canonical) = &result.metadata.canonical_id {
                    let resolved = parse_id(canonical)?;
                    verify_cid(&parsed_id.cid, &resolved.cid, &parsed_id.suffix, self.graph.as_ref(), id).await?;
                }
            }
        }

        if self.config.anchor_origin_reconciliation_enabled {
            match self.reconcile(id, &result).await {
                Ok(Some(reconciled)) => return Ok(reconciled),
                Ok(None) => {}
                Err(err) => {
                    warn!(id, error = %err, "anchor-origin reconciliation failed, returning local result");
                }
            }
        }

        Ok(result)
    }

    async fn substitute_unpublished(&self, id: &str) -> ResolverResult<String> {
        let Some(store) = &self.create_store else {
            return Err(ResolverError::DocumentNotFound(id.to_string()));
        };
        match store.lookup_unpublished(id).await? {
            Some(equivalent) => Ok(equivalent),
            None => Err(ResolverError::DocumentNotFound(id.to_string())),
        }
    }

    /// §4.G.2: when the document's anchor origin differs from the local
    /// domain, fetch and re-resolve remotely, folding in any published
    /// operations the remote chain has that the local one lacks, then
    /// accept the result only if document/commitments still match.
    async fn reconcile(&self, id: &str, local: &ResolutionResult) -> ResolverResult<Option<ResolutionResult>> {
        let Some(origin) = &local.metadata.anchor_origin else {
            return Ok(None);
        };
        if origin == &self.config.local_domain {
            return Ok(None);
        }
        let Some(webfinger) = &self.webfinger else {
            return Ok(None);
        };

        let endpoint_origin = self
            .domain_resolver
            .origin_for(origin)
            .unwrap_or_else(|| origin.clone());
        let endpoint = webfinger
            .host_meta_link(&endpoint_origin, &self.config.resolution_media_type)
            .await?
            .ok_or_else(|| ResolverError::ResourceNotFound(origin.clone()))?;

        let remote_url = format!("{endpoint}/{id}");
        let response = self.http.get(&remote_url).send().await?;
        if !response.status().is_success() {
            return Err(ResolverError::from_status(response.status(), &remote_url));
        }
        let remote: ResolutionResult = response.json().await?;

        let local_refs = operation_references(&local.metadata.published_operations);
        let extra_ops: Vec<Value> = remote
            .metadata
            .published_operations
            .iter()
            .filter(|op| {
                canonical_reference(op)
                    .map(|r| !local_refs.contains(&r))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        if extra_ops.is_empty() {
            debug!(id, "no remote-ahead operations found during reconciliation");
            return Ok(None);
        }

        let reconciled = self.processor.resolve_with_operations(id, &extra_ops).await?;

        let matches = reconciled.document == remote.document
            && reconciled.metadata.update_commitment == remote.metadata.update_commitment
            && reconciled.metadata.recovery_commitment == remote.metadata.recovery_commitment;

        if matches {
            Ok(Some(reconciled))
        } else {
            warn!(id, "anchor-origin reconciliation produced a mismatched document, discarding");
            Ok(None)
        }
    }
}

fn is_not_found(err: &ResolverError) -> bool {
    err.to_string().to_lowercase().contains("not found")
}

fn canonical_reference(op: &Value) -> Option<String> {
    op.get("canonicalReference").and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn operation_references(ops: &[Value]) -> std::collections::HashSet<String> {
    ops.iter().filter_map(canonical_reference).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;
    use std::sync::Mutex;

    struct FixedProcessor {
        result: ResolutionResult,
        with_ops_result: Option<ResolutionResult>,
    }

    #[async_trait]
    impl OperationProcessor for FixedProcessor {
        async fn resolve(&self, _id: &str) -> ResolverResult<ResolutionResult> {
            Ok(self.result.clone())
        }

        async fn resolve_with_operations(&self, _id: &str, _extra_operations: &[Value]) -> ResolverResult<ResolutionResult> {
            self.with_ops_result
                .clone()
                .ok_or_else(|| ResolverError::Other(anyhow::anyhow!("no extra-ops result configured")))
        }
    }

    struct NotFoundProcessor;

    #[async_trait]
    impl OperationProcessor for NotFoundProcessor {
        async fn resolve(&self, id: &str) -> ResolverResult<ResolutionResult> {
            Err(ResolverError::Other(anyhow::anyhow!("document not found: {id}")))
        }

        async fn resolve_with_operations(&self, _id: &str, _extra_operations: &[Value]) -> ResolverResult<ResolutionResult> {
            unreachable!()
        }
    }

    struct NoopCreateStore;

    #[async_trait]
    impl CreateDocumentStore for NoopCreateStore {
        async fn lookup_unpublished(&self, _label: &str) -> ResolverResult<Option<String>> {
            Ok(None)
        }
    }

    struct SubstitutingCreateStore;

    #[async_trait]
    impl CreateDocumentStore for SubstitutingCreateStore {
        async fn lookup_unpublished(&self, _label: &str) -> ResolverResult<Option<String>> {
            Ok(Some("did:anchor:EiResolved:suffix1".to_string()))
        }
    }

    struct EmptyGraph;

    #[async_trait]
    impl AnchorGraph for EmptyGraph {
        async fn walk(&self, _from_cid: &str, _suffix: &str) -> ResolverResult<Vec<String>> {
            Ok(vec![])
        }
    }

    struct RecordingScheduler {
        calls: Mutex<Vec<String>>,
    }

    impl DiscoveryScheduler for RecordingScheduler {
        fn schedule(&self, id: &str) {
            self.calls.lock().unwrap().push(id.to_string());
        }
    }

    fn config() -> ResolverConfig {
        ResolverConfig {
            local_domain: "local.example".to_string(),
            anchor_origin_reconciliation_enabled: false,
            discovery_enabled: true,
            resolution_media_type: "application/did+ld+json".to_string(),
        }
    }

    #[tokio::test]
    async fn resolves_published_document_with_matching_cid() {
        let result = ResolutionResult {
            document: serde_json::json!({"id": "did:anchor:EiA:suffix1"}),
            metadata: DocumentMetadata {
                published: true,
                canonical_id: Some("did:anchor:EiA:suffix1".to_string()),
                ..Default::default()
            },
        };
        let processor = Arc::new(FixedProcessor {
            result,
            with_ops_result: None,
        });
        let resolver = Resolver::new(
            processor,
            Some(Arc::new(NoopCreateStore)),
            Arc::new(EmptyGraph),
            None,
            None,
            Arc::new(crate::webfinger::DidWebDomainResolver),
            reqwest::Client::new(),
            config(),
        );
        let resolved = resolver.resolve_document("did:anchor:EiA:suffix1").await.unwrap();
        assert!(resolved.metadata.published);
    }

    #[tokio::test]
    async fn not_found_for_unpublished_label_consults_create_store() {
        let processor = Arc::new(NotFoundProcessor);
        let resolver = Resolver::new(
            processor,
            Some(Arc::new(SubstitutingCreateStore)),
            Arc::new(EmptyGraph),
            None,
            None,
            Arc::new(crate::webfinger::DidWebDomainResolver),
            reqwest::Client::new(),
            config(),
        );
        // An id with no cid:suffix pair is treated as an unpublished label;
        // the substituted id is also not-found here since the processor
        // always errors, so we only assert the substitution was attempted.
        let err = resolver.resolve_document("did:anchor:unpublished-label").await.unwrap_err();
        assert!(matches!(err, ResolverError::Other(_)));
    }

    #[tokio::test]
    async fn not_found_for_published_id_schedules_discovery() {
        let processor = Arc::new(NotFoundProcessor);
        let scheduler = Arc::new(RecordingScheduler { calls: Mutex::new(vec![]) });
        let resolver = Resolver::new(
            processor,
            Some(Arc::new(NoopCreateStore)),
            Arc::new(EmptyGraph),
            Some(scheduler.clone()),
            None,
            Arc::new(crate::webfinger::DidWebDomainResolver),
            reqwest::Client::new(),
            config(),
        );
        let err = resolver.resolve_document("did:anchor:EiA:suffix1").await.unwrap_err();
        assert!(matches!(err, ResolverError::Other(_)));
        assert_eq!(scheduler.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mismatched_cid_not_on_path_is_document_not_found() {
        let result = ResolutionResult {
            document: serde_json::json!({"id": "did:anchor:EiNew:suffix1"}),
            metadata: DocumentMetadata {
                published: true,
                canonical_id: Some("did:anchor:EiNew:suffix1".to_string()),
                ..Default::default()
            },
        };
        let processor = Arc::new(FixedProcessor {
            result,
            with_ops_result: None,
        });
        let resolver = Resolver::new(
            processor,
            None,
            Arc::new(EmptyGraph),
            None,
            None,
            Arc::new(crate::webfinger::DidWebDomainResolver),
            reqwest::Client::new(),
            config(),
        );
        let err = resolver.resolve_document("did:anchor:EiOld:suffix1").await.unwrap_err();
        assert!(matches!(err, ResolverError::DocumentNotFound(_)));
    }
}
