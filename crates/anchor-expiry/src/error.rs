use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpiryError {
    #[error("transient expiry error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExpiryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExpiryError::Transient(_))
    }
}

impl From<anchor_store::StoreError> for ExpiryError {
    fn from(err: anchor_store::StoreError) -> Self {
        ExpiryError::Transient(err.into())
    }
}

pub type ExpiryResult<T> = Result<T, ExpiryError>;
