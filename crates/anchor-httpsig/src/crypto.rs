use crate::error::SignatureError;
use crate::key_type::KeyType;
use signature::Verifier as _;

/// Ed25519 `SubjectPublicKeyInfo` DER prefix: ASN.1 header for
/// `algorithm = id-Ed25519`, followed by the 32-byte raw public key. Parsing
/// it by stripping this fixed prefix avoids pulling in a full x509 stack for
/// a single well-known OID, the same shortcut Fediverse implementations take.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

fn decode_ed25519_public_key(pem: &str) -> Result<ed25519_dalek::PublicKey, SignatureError> {
    let parsed = pem::parse(pem).map_err(|e| {
        SignatureError::Other(anyhow::anyhow!("invalid PEM for ed25519 key: {e}"))
    })?;
    let der = parsed.contents();
    let raw = der
        .strip_prefix(&ED25519_SPKI_PREFIX[..])
        .ok_or_else(|| anyhow::anyhow!("unexpected ed25519 SPKI layout"))?;
    ed25519_dalek::PublicKey::from_bytes(raw)
        .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid ed25519 public key: {e}")))
}

/// Verify `signature` over `message` using the public key `pem` carries,
/// dispatching on `key_type` (§4.B.1). A fresh verifier is constructed for
/// each call since the underlying signature primitives are not meant to be
/// shared stateful objects across calls (§4.B.2, §5).
pub fn verify(
    key_type: KeyType,
    pem: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, SignatureError> {
    match key_type {
        KeyType::Ed25519 => {
            let key = decode_ed25519_public_key(pem)?;
            let sig = ed25519_dalek::Signature::from_bytes(signature)
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid ed25519 signature: {e}")))?;
            Ok(key.verify(message, &sig).is_ok())
        }
        KeyType::P256 => {
            use p256::ecdsa::{Signature, VerifyingKey};
            use p256::pkcs8::DecodePublicKey;
            let key = VerifyingKey::from_public_key_pem(pem)
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid P-256 public key: {e}")))?;
            let sig = Signature::from_der(signature).or_else(|_| Signature::try_from(signature))
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid P-256 signature: {e}")))?;
            Ok(key.verify(message, &sig).is_ok())
        }
        KeyType::P384 => {
            use p384::ecdsa::{Signature, VerifyingKey};
            use p384::pkcs8::DecodePublicKey;
            let key = VerifyingKey::from_public_key_pem(pem)
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid P-384 public key: {e}")))?;
            let sig = Signature::from_der(signature).or_else(|_| Signature::try_from(signature))
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid P-384 signature: {e}")))?;
            Ok(key.verify(message, &sig).is_ok())
        }
        KeyType::P521 => {
            use p521::ecdsa::{Signature, VerifyingKey};
            use p521::pkcs8::DecodePublicKey;
            let key = VerifyingKey::from_public_key_pem(pem)
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid P-521 public key: {e}")))?;
            let sig = Signature::from_der(signature).or_else(|_| Signature::try_from(signature))
                .map_err(|e| SignatureError::Other(anyhow::anyhow!("invalid P-521 signature: {e}")))?;
            Ok(key.verify(message, &sig).is_ok())
        }
    }
}
