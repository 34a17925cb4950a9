use std::sync::Arc;

use anchor_common::Iri;

use crate::actor_retriever::ActorRetriever;
use crate::crypto;
use crate::error::{SignatureError, SignatureResult};
use crate::header::parse_signature_header;
use crate::key_type::KeyType;
use crate::request::SignableRequest;

/// Verifies incoming federation requests (§4.B.2). A fresh `Verifier`
/// borrow is used per call — no state survives across verifications, since
/// the crypto primitives underneath are not thread-safe to share.
pub struct Verifier<R: ActorRetriever> {
    actor_retriever: Arc<R>,
}

impl<R: ActorRetriever> Verifier<R> {
    pub fn new(actor_retriever: Arc<R>) -> Self {
        Self { actor_retriever }
    }

    /// Returns `Ok((true, Some(actor_iri)))` on success, `Ok((false, None))`
    /// on any non-transient rejection, and `Err` only when the cause is
    /// transient and the caller should retry (§4.B.2, §7).
    pub async fn verify_request(
        &self,
        request: &SignableRequest,
    ) -> SignatureResult<(bool, Option<Iri>)> {
        match self.verify_request_inner(request).await {
            Ok(actor_iri) => Ok((true, Some(actor_iri))),
            Err(e) if e.is_transient() => Err(e),
            Err(_) => Ok((false, None)),
        }
    }

    async fn verify_request_inner(&self, request: &SignableRequest) -> SignatureResult<Iri> {
        let header = request
            .header_str("signature")
            .ok_or(SignatureError::MissingSignatureHeader)?;
        let params = parse_signature_header(header)?;

        let public_key = self
            .actor_retriever
            .get_public_key(&params.key_id)
            .await?;

        let key_type = match &params.algorithm {
            Some(alg) => KeyType::from_algorithm_name(alg)?,
            None => return Err(SignatureError::MalformedHeader("missing algorithm".to_string())),
        };

        let covered: Vec<&str> = params.headers.iter().map(String::as_str).collect();
        let signing_string = request.signing_string(&covered)?;

        let ok = crypto::verify(
            key_type,
            &public_key.public_key_pem,
            signing_string.as_bytes(),
            &params.signature,
        )?;
        if !ok {
            return Err(SignatureError::VerificationFailed);
        }

        let actor = self.actor_retriever.get_actor(&public_key.owner).await?;

        // §4.B.2 step 5: block key-substitution impersonation.
        if actor.public_key.id != public_key.id {
            return Err(SignatureError::VerificationFailed);
        }

        Ok(Iri::new(actor.id))
    }
}
