use thiserror::Error;

/// The error kinds the core defines (§7). Every crate-local error enum
/// ultimately classifies into one of these, either by wrapping a `CoreError`
/// directly or by exposing an equivalent `.is_transient()` predicate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Wraps a cause that should be retried by the caller (network error,
    /// 5xx, or an inner error that was itself already transient). Transient
    /// is sticky: anything that wraps a transient cause must also report
    /// transient so outer retries fire.
    #[error("transient http error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("witness not found: {0}")]
    WitnessNotFound(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("policy parse error: {0}")]
    PolicyParseError(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// True for anything a caller should retry rather than surface to the user.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }

    pub fn transient(cause: impl Into<anyhow::Error>) -> Self {
        CoreError::Transient(cause.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
