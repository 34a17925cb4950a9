use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use http::Method;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::SignatureResult;
use crate::key_manager::KeyManager;
use crate::request::{compute_digest, SignableRequest};

const GET_HEADERS: &[&str] = &["(request-target)", "date"];
const POST_HEADERS: &[&str] = &["(request-target)", "date", "digest"];

/// Signs outgoing federation requests (§4.B.1). Mutates the request in
/// place by adding `Date`, (for bodies) `Digest`, and `Signature` headers.
pub struct Signer<K: KeyManager> {
    key_manager: Arc<K>,
}

impl<K: KeyManager> Signer<K> {
    pub fn new(key_manager: Arc<K>) -> Self {
        Self { key_manager }
    }

    pub async fn sign_request(
        &self,
        pub_key_id: &str,
        request: &mut SignableRequest,
    ) -> SignatureResult<()> {
        request.set_header("date", httpdate::fmt_http_date(SystemTime::now()))?;

        let covered_headers: &[&str] = if let Some(body) = &request.body {
            let digest = compute_digest(body);
            request.set_header("digest", digest)?;
            POST_HEADERS
        } else if request.method != Method::GET {
            // A body-bearing method with no body yet (e.g. an empty POST)
            // still commits to covering Digest, computed over empty bytes.
            let digest = compute_digest(&[]);
            request.set_header("digest", digest)?;
            POST_HEADERS
        } else {
            GET_HEADERS
        };

        let signing_string = request.signing_string(covered_headers)?;
        let key_type = self.key_manager.key_type(pub_key_id).await?;
        let signature = self
            .key_manager
            .sign(pub_key_id, signing_string.as_bytes())
            .await?;

        let header_value = format!(
            "keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            pub_key_id,
            key_type.algorithm_name(),
            covered_headers.join(" "),
            Base64.encode(signature),
        );
        request.set_header("signature", header_value)?;
        Ok(())
    }
}
