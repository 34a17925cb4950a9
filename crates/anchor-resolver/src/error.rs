use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("transient resolver error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResolverError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolverError::Transient(_))
    }

    /// §4.G.4/.G.5: ≥500 is transient; 4xx (other than 404, which is
    /// `ResourceNotFound`) is persistent.
    pub fn from_status(status: reqwest::StatusCode, resource: &str) -> Self {
        if status.as_u16() == 404 {
            ResolverError::ResourceNotFound(resource.to_string())
        } else if status.is_server_error() {
            ResolverError::Transient(anyhow::anyhow!("upstream status {status}"))
        } else {
            ResolverError::Other(anyhow::anyhow!("upstream status {status} for {resource}"))
        }
    }
}

impl From<reqwest::Error> for ResolverError {
    fn from(err: reqwest::Error) -> Self {
        ResolverError::Transient(err.into())
    }
}

pub type ResolverResult<T> = Result<T, ResolverError>;
