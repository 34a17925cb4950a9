use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ResolverError, ResolverResult};

#[derive(Debug, Clone, Deserialize)]
struct Jrd {
    #[serde(default)]
    links: Vec<JrdLink>,
}

#[derive(Debug, Clone, Deserialize)]
struct JrdLink {
    #[serde(rename = "type")]
    media_type: Option<String>,
    href: Option<String>,
}

/// Translates a foreign id (e.g. `did:web:*`) into the HTTP origin to query
/// (§4.G.4: "a domain resolver translates the id into the HTTP origin
/// first").
pub trait DomainResolver: Send + Sync {
    fn origin_for(&self, id: &str) -> Option<String>;
}

/// `did:web:<domain>[:<path>...]` -> `https://<domain>` (percent-decoding
/// `%3A` back into `:` for non-default ports, per the `did:web` method).
pub struct DidWebDomainResolver;

impl DomainResolver for DidWebDomainResolver {
    fn origin_for(&self, id: &str) -> Option<String> {
        let rest = id.strip_prefix("did:web:")?;
        let domain_segment = rest.split(':').next()?;
        let domain = domain_segment.replace("%3A", ":");
        Some(format!("https://{domain}"))
    }
}

/// WebFinger-style discovery client with host-meta endpoint lookup and
/// resource/ledger lookups (§4.G.4, §4.G.5), each memoized in its own
/// `moka::future::Cache`.
pub struct WebFingerClient {
    http: reqwest::Client,
    host_meta_cache: Cache<String, Arc<Option<String>>>,
    resource_cache: Cache<String, Arc<Value>>,
}

impl WebFingerClient {
    pub fn new(http: reqwest::Client, capacity: u64, ttl: Duration) -> Self {
        Self {
            http,
            host_meta_cache: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
            resource_cache: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }

    /// §4.G.4: `{origin}/.well-known/host-meta.json`, memoized, picking the
    /// first `link` whose `type` matches `media_type`.
    pub async fn host_meta_link(&self, origin: &str, media_type: &str) -> ResolverResult<Option<String>> {
        let cache_key = format!("{origin}|{media_type}");
        let http = self.http.clone();
        let origin = origin.to_string();
        let media_type = media_type.to_string();
        self.host_meta_cache
            .try_get_with(cache_key, async move {
                let url = format!("{origin}/.well-known/host-meta.json");
                let response = http.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(ResolverError::from_status(response.status(), &url));
                }
                let jrd: Jrd = response.json().await?;
                Ok::<Arc<Option<String>>, ResolverError>(Arc::new(
                    jrd.links
                        .into_iter()
                        .find(|l| l.media_type.as_deref() == Some(media_type.as_str()))
                        .and_then(|l| l.href),
                ))
            })
            .await
            .map(|arc| (*arc).clone())
            .map_err(|e: Arc<ResolverError>| rewrap(&e))
    }

    /// §4.G.5: `{origin}/.well-known/webfinger?resource=<percent-encoded>`.
    /// `404` surfaces as `ResourceNotFound`; `>=500` as transient; other
    /// 4xx otherwise.
    pub async fn resource_lookup(&self, origin: &str, resource: &str) -> ResolverResult<Value> {
        let cache_key = format!("{origin}|{resource}");
        let http = self.http.clone();
        let origin = origin.to_string();
        let encoded = percent_encoding::utf8_percent_encode(resource, percent_encoding::NON_ALPHANUMERIC).to_string();
        self.resource_cache
            .try_get_with(cache_key, async move {
                let url = format!("{origin}/.well-known/webfinger?resource={encoded}");
                let response = http.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(ResolverError::from_status(response.status(), &url));
                }
                let value: Value = response.json().await?;
                Ok::<Arc<Value>, ResolverError>(Arc::new(value))
            })
            .await
            .map(|arc| (*arc).clone())
            .map_err(|e: Arc<ResolverError>| rewrap(&e))
    }
}

fn rewrap(e: &ResolverError) -> ResolverError {
    match e {
        ResolverError::Transient(_) => ResolverError::Transient(anyhow::anyhow!("{e}")),
        ResolverError::DocumentNotFound(id) => ResolverError::DocumentNotFound(id.clone()),
        ResolverError::ResourceNotFound(id) => ResolverError::ResourceNotFound(id.clone()),
        ResolverError::Other(_) => ResolverError::Other(anyhow::anyhow!("{e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_web_translates_plain_domain() {
        let resolver = DidWebDomainResolver;
        assert_eq!(
            resolver.origin_for("did:web:example.com"),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn did_web_decodes_port_escape() {
        let resolver = DidWebDomainResolver;
        assert_eq!(
            resolver.origin_for("did:web:example.com%3A8443:path"),
            Some("https://example.com:8443".to_string())
        );
    }

    #[test]
    fn did_web_rejects_other_methods() {
        let resolver = DidWebDomainResolver;
        assert_eq!(resolver.origin_for("did:anchor:abc"), None);
    }
}
