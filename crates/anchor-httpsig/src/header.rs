use std::collections::HashMap;

use crate::error::SignatureError;

/// Parsed `Signature:` header parameters (§6.2): comma-separated `k=v`
/// pairs, values optionally double-quoted.
#[derive(Debug, Clone, Default)]
pub struct SignatureParams {
    pub key_id: String,
    pub algorithm: Option<String>,
    pub headers: Vec<String>,
    pub signature: Vec<u8>,
}

/// Parse `keyId="...",algorithm="...",headers="...",signature="..."`
/// (§4.B.2 step 2: "parse comma-separated `k=v` pairs, stripping quotes").
pub fn parse_signature_header(value: &str) -> Result<SignatureParams, SignatureError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    for pair in value.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, raw_value) = pair
            .split_once('=')
            .ok_or_else(|| SignatureError::MalformedHeader(pair.to_string()))?;
        let value = raw_value.trim().trim_matches('"').to_string();
        fields.insert(key.trim().to_ascii_lowercase(), value);
    }

    let key_id = fields
        .remove("keyid")
        .ok_or_else(|| SignatureError::MalformedHeader("missing keyId".to_string()))?;
    let algorithm = fields.remove("algorithm");
    let headers = fields
        .remove("headers")
        .map(|h| h.split_whitespace().map(str::to_string).collect())
        .unwrap_or_else(|| vec!["(request-target)".to_string(), "date".to_string()]);
    let signature_b64 = fields
        .remove("signature")
        .ok_or_else(|| SignatureError::MalformedHeader("missing signature".to_string()))?;

    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine;
    let signature = Base64
        .decode(signature_b64)
        .map_err(|e| SignatureError::MalformedHeader(format!("invalid signature base64: {e}")))?;

    Ok(SignatureParams {
        key_id,
        algorithm,
        headers,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_fields() {
        let header = r#"keyId="https://a.example/key1",algorithm="ed25519",headers="(request-target) date digest",signature="aGVsbG8="#;
        let header = format!("{header}\"");
        let parsed = parse_signature_header(&header).unwrap();
        assert_eq!(parsed.key_id, "https://a.example/key1");
        assert_eq!(parsed.algorithm.as_deref(), Some("ed25519"));
        assert_eq!(
            parsed.headers,
            vec!["(request-target)", "date", "digest"]
        );
        assert_eq!(parsed.signature, b"hello".to_vec());
    }

    #[test]
    fn rejects_missing_keyid() {
        let header = r#"algorithm="ed25519",signature="aGVsbG8=""#;
        assert!(parse_signature_header(header).is_err());
    }

    #[test]
    fn defaults_headers_when_absent() {
        let header = r#"keyId="k1",signature="aGVsbG8=""#;
        let parsed = parse_signature_header(header).unwrap();
        assert_eq!(parsed.headers, vec!["(request-target)", "date"]);
    }
}
