use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("transient http error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("missing Signature header")]
    MissingSignatureHeader,

    #[error("malformed Signature header: {0}")]
    MalformedHeader(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("actor {0} not found")]
    ActorNotFound(String),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SignatureError {
    /// §4.B.2: transport errors, or underlying errors whose string contains
    /// `transient http error:`, are wrapped as transient. Anything else is a
    /// verification rejection, not a failure to decide.
    pub fn is_transient(&self) -> bool {
        match self {
            SignatureError::Transient(_) => true,
            SignatureError::Other(e) => e.to_string().contains("transient http error:"),
            _ => false,
        }
    }
}

pub type SignatureResult<T> = Result<T, SignatureError>;
