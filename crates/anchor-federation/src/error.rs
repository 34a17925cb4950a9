use thiserror::Error;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("transient federation error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("component is not started")]
    NotStarted,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FederationError {
    /// §7: transient is sticky — a step wrapping a transient cause must
    /// itself classify as transient so outer retries fire.
    pub fn is_transient(&self) -> bool {
        matches!(self, FederationError::Transient(_))
    }

    /// §4.C.6: 5xx and transport errors are transient; 4xx is persistent.
    pub fn from_status(status: http::StatusCode) -> Self {
        if status.is_server_error() {
            FederationError::Transient(anyhow::anyhow!("upstream status {status}"))
        } else {
            FederationError::BadRequest(format!("upstream status {status}"))
        }
    }
}

impl From<anchor_store::StoreError> for FederationError {
    fn from(err: anchor_store::StoreError) -> Self {
        FederationError::Transient(err.into())
    }
}

impl From<reqwest::Error> for FederationError {
    fn from(err: reqwest::Error) -> Self {
        FederationError::Transient(err.into())
    }
}

impl From<anchor_httpsig::SignatureError> for FederationError {
    fn from(err: anchor_httpsig::SignatureError) -> Self {
        if err.is_transient() {
            FederationError::Transient(err.into())
        } else {
            FederationError::Unauthorized
        }
    }
}

pub type FederationResult<T> = Result<T, FederationError>;
