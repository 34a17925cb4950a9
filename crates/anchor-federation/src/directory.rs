use async_trait::async_trait;

use anchor_vocab::Actor;

use crate::error::FederationResult;

/// Resolves a foreign IRI to the inbox(es) it denotes, and fetches actor
/// documents by IRI (§4.C.3: "host-meta WebFinger lookup, then references
/// collection, then actor document"). Kept as a trait so outbox delivery can
/// be tested without a live network.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Resolve `iri` (a foreign reference collection or actor IRI) to the
    /// actor IRIs it expands to. A plain actor IRI resolves to itself.
    async fn resolve_actor_iris(&self, iri: &str) -> FederationResult<Vec<String>>;

    async fn fetch_actor(&self, actor_iri: &str) -> FederationResult<Actor>;
}

/// `reqwest`-backed `ActorDirectory`: WebFinger host-meta discovery, then a
/// linkset-of-references fetch, then per-actor document fetches (§4.C.3,
/// §6.3, §6.4). Collapsed into one HTTP round trip per referenced actor.
pub struct HttpActorDirectory {
    client: reqwest::Client,
}

impl HttpActorDirectory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn host_meta_link(&self, origin: &str, media_type: &str) -> FederationResult<Option<String>> {
        let url = format!("{origin}/.well-known/host-meta.json");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::FederationError::from_status(response.status()));
        }
        let jrd: serde_json::Value = response.json().await?;
        let links = jrd.get("links").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        Ok(links
            .into_iter()
            .find(|link| link.get("type").and_then(|t| t.as_str()) == Some(media_type))
            .and_then(|link| link.get("href").and_then(|h| h.as_str()).map(str::to_string)))
    }
}

#[async_trait]
impl ActorDirectory for HttpActorDirectory {
    async fn resolve_actor_iris(&self, iri: &str) -> FederationResult<Vec<String>> {
        let url = url::Url::parse(iri).map_err(|e| anyhow::anyhow!(e))?;
        let origin = format!("{}://{}", url.scheme(), url.authority());

        let references_href = self
            .host_meta_link(&origin, "application/linkset+json")
            .await?;
        let Some(references_href) = references_href else {
            // No references collection advertised: treat `iri` as a bare
            // actor reference.
            return Ok(vec![iri.to_string()]);
        };

        let response = self.client.get(&references_href).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::FederationError::from_status(response.status()));
        }
        let linkset: anchor_vocab::Linkset = response.json().await?;
        let iris = linkset
            .linkset
            .into_iter()
            .flat_map(|link| link.author.into_iter().map(|a| a.href))
            .collect();
        Ok(iris)
    }

    async fn fetch_actor(&self, actor_iri: &str) -> FederationResult<Actor> {
        let response = self.client.get(actor_iri).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::FederationError::from_status(response.status()));
        }
        Ok(response.json().await?)
    }
}
