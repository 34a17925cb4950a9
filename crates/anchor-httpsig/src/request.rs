use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use sha2::{Digest, Sha256};

use crate::error::SignatureError;

/// A framework-agnostic view of an HTTP request, just enough to sign or
/// verify it: the transport-specific `reqwest`/`axum` types are converted
/// into this at the call site, keeping the signature logic itself
/// independent of which HTTP stack sends or receives the request.
#[derive(Debug, Clone)]
pub struct SignableRequest {
    pub method: Method,
    /// The request path + query, e.g. `/actor/inbox`.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl SignableRequest {
    pub fn new(method: Method, path_and_query: impl Into<String>) -> Self {
        Self {
            method,
            path_and_query: path_and_query.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn set_header(&mut self, name: &str, value: String) -> Result<(), SignatureError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid header name: {e}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn request_target_line(&self) -> String {
        format!(
            "(request-target): {} {}",
            self.method.as_str().to_ascii_lowercase(),
            self.path_and_query
        )
    }

    /// Build the signing string covering exactly `covered_headers`, in the
    /// order given (§4.B.1: "Signature covers the configured header set").
    pub fn signing_string(&self, covered_headers: &[&str]) -> Result<String, SignatureError> {
        let mut lines = Vec::with_capacity(covered_headers.len());
        for header in covered_headers {
            if *header == "(request-target)" {
                lines.push(self.request_target_line());
                continue;
            }
            let value = self.header_str(header).ok_or_else(|| {
                SignatureError::MalformedHeader(format!("missing covered header: {header}"))
            })?;
            lines.push(format!("{}: {}", header.to_ascii_lowercase(), value));
        }
        Ok(lines.join("\n"))
    }
}

/// `Digest: SHA-256=<base64>` (§6.2).
pub fn compute_digest(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("SHA-256={}", Base64.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_string_covers_request_target_and_date() {
        let mut request = SignableRequest::new(Method::GET, "/actor");
        request.set_header("date", "Tue, 01 Jan 2030 00:00:00 GMT".to_string()).unwrap();
        let signing_string = request
            .signing_string(&["(request-target)", "date"])
            .unwrap();
        assert_eq!(
            signing_string,
            "(request-target): get /actor\ndate: Tue, 01 Jan 2030 00:00:00 GMT"
        );
    }

    #[test]
    fn signing_string_fails_on_missing_covered_header() {
        let request = SignableRequest::new(Method::GET, "/actor");
        assert!(request.signing_string(&["(request-target)", "date"]).is_err());
    }

    #[test]
    fn digest_is_stable_for_same_body() {
        assert_eq!(compute_digest(b"hello"), compute_digest(b"hello"));
        assert_ne!(compute_digest(b"hello"), compute_digest(b"world"));
    }
}
