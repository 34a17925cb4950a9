use thiserror::Error;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("transient witness store error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("no witness proofs for anchor {0}")]
    NotFound(String),

    #[error("witness {0} not found among proofs")]
    WitnessNotFound(String),

    #[error("policy parse error: {0}")]
    PolicyParseError(String),

    #[error("insufficient witnesses to satisfy policy")]
    InsufficientWitnesses,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WitnessError {
    /// §4.E.1: any underlying `Batch`/`Query`/`Put` storage error is wrapped
    /// as transient so the surrounding pipeline retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, WitnessError::Transient(_))
    }

    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        WitnessError::Transient(err.into())
    }
}

impl From<anchor_store::StoreError> for WitnessError {
    fn from(err: anchor_store::StoreError) -> Self {
        WitnessError::Transient(err.into())
    }
}

pub type WitnessResult<T> = Result<T, WitnessError>;
