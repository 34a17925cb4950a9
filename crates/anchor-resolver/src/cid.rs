use async_trait::async_trait;

use anchor_vocab::Hashlink;

use crate::error::{ResolverError, ResolverResult};

/// The `(cid, suffix)` pair a DID id decomposes into (§4.G.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub cid: String,
    pub suffix: String,
}

/// Split `id` on `:`. If a hashlink segment (`hl:...`) is present, its
/// resource hash becomes the cid; otherwise the penultimate
/// colon-separated component is the cid (§4.G.3).
pub fn parse_id(id: &str) -> ResolverResult<ParsedId> {
    let segments: Vec<&str> = id.split(':').collect();
    if let Some(hl_index) = segments.iter().position(|s| *s == "hl") {
        let hashlink_str = segments[hl_index..].get(0..2).map(|s| s.join(":"))
            .ok_or_else(|| ResolverError::Other(anyhow::anyhow!("truncated hashlink segment in id")))?;
        let hashlink = Hashlink::parse(&hashlink_str)
            .map_err(|e| ResolverError::Other(anyhow::anyhow!(e)))?;
        let suffix = segments
            .last()
            .ok_or_else(|| ResolverError::Other(anyhow::anyhow!("empty id")))?
            .to_string();
        return Ok(ParsedId { cid: hashlink.hash_part, suffix });
    }

    if segments.len() < 2 {
        return Err(ResolverError::Other(anyhow::anyhow!("id has no cid:suffix pair: {id}")));
    }
    let suffix = segments[segments.len() - 1].to_string();
    let cid = segments[segments.len() - 2].to_string();
    Ok(ParsedId { cid, suffix })
}

/// Walks the anchor graph backward from `(from_cid, suffix)`, returning the
/// chain of older cids on the path (§4.G.3). Implementations fetch and
/// parse the actual anchor/Linkset chain; this crate fixes the interface.
#[async_trait]
pub trait AnchorGraph: Send + Sync {
    async fn walk(&self, from_cid: &str, suffix: &str) -> ResolverResult<Vec<String>>;
}

/// §4.G.3: if the resolved document's canonical cid differs from the
/// requested one, the requested cid must appear somewhere on the anchor
/// graph's path from the resolved cid — i.e. be an older cid — or the
/// lookup is a `DocumentNotFound`.
pub async fn verify_cid(
    requested_cid: &str,
    resolved_cid: &str,
    suffix: &str,
    graph: &dyn AnchorGraph,
    requested_id: &str,
) -> ResolverResult<()> {
    if requested_cid == resolved_cid {
        return Ok(());
    }
    let path = graph.walk(resolved_cid, suffix).await?;
    if path.iter().any(|cid| cid == requested_cid) {
        Ok(())
    } else {
        Err(ResolverError::DocumentNotFound(requested_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cid_suffix_pair() {
        let parsed = parse_id("did:anchor:EiAbc123:suffix1").unwrap();
        assert_eq!(parsed.cid, "EiAbc123");
        assert_eq!(parsed.suffix, "suffix1");
    }

    #[test]
    fn parses_hashlink_segment_as_cid() {
        let hl = Hashlink::from_content(b"payload");
        let id = format!("did:anchor:{hl}:suffix1");
        let parsed = parse_id(&id).unwrap();
        assert_eq!(parsed.cid, hl.hash_part);
        assert_eq!(parsed.suffix, "suffix1");
    }

    struct FixedGraph {
        path: Vec<String>,
    }

    #[async_trait]
    impl AnchorGraph for FixedGraph {
        async fn walk(&self, _from_cid: &str, _suffix: &str) -> ResolverResult<Vec<String>> {
            Ok(self.path.clone())
        }
    }

    #[tokio::test]
    async fn verify_cid_accepts_matching_requested_cid() {
        let graph = FixedGraph { path: vec![] };
        verify_cid("EiA", "EiA", "suffix1", &graph, "did:anchor:EiA:suffix1").await.unwrap();
    }

    #[tokio::test]
    async fn verify_cid_accepts_older_cid_on_path() {
        let graph = FixedGraph { path: vec!["EiOld".to_string()] };
        verify_cid("EiOld", "EiNew", "suffix1", &graph, "did:anchor:EiOld:suffix1").await.unwrap();
    }

    #[tokio::test]
    async fn verify_cid_rejects_cid_not_on_path() {
        let graph = FixedGraph { path: vec!["EiOld".to_string()] };
        let result = verify_cid("EiUnrelated", "EiNew", "suffix1", &graph, "did:anchor:EiUnrelated:suffix1").await;
        assert!(matches!(result, Err(ResolverError::DocumentNotFound(_))));
    }
}
