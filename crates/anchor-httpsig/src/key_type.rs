use crate::error::SignatureError;

/// Recognized public-key curve types (§4.B.1). Any other type surfaces
/// `UnsupportedKeyType` rather than attempting a generic verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Ed25519,
    P256,
    P384,
    P521,
}

impl KeyType {
    /// The `algorithm` parameter this node writes into outgoing `Signature`
    /// headers (§6.2), and the value it expects (case-insensitively) on
    /// incoming ones.
    pub fn algorithm_name(self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::P256 => "ecdsa-p256-sha256",
            KeyType::P384 => "ecdsa-p384-sha384",
            KeyType::P521 => "ecdsa-p521-sha512",
        }
    }

    pub fn from_algorithm_name(name: &str) -> Result<Self, SignatureError> {
        match name.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "ecdsa-p256-sha256" => Ok(KeyType::P256),
            "ecdsa-p384-sha384" => Ok(KeyType::P384),
            "ecdsa-p521-sha512" => Ok(KeyType::P521),
            other => Err(SignatureError::UnsupportedKeyType(other.to_string())),
        }
    }
}
