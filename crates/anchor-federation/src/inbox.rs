use std::sync::Arc;

use anchor_httpsig::{ActorRetriever, SignableRequest, Verifier};
use anchor_vocab::Activity;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::FederationError;

const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;
const DEFAULT_SUBSCRIBER_POOL_SIZE: usize = 5;

/// Invoked once per received activity, after authentication (§4.D step 4).
/// Handler errors classify as transient (nack, i.e. redeliver) vs
/// persistent (ack, i.e. drop).
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn handle(&self, actor_iri: &str, activity: Activity) -> Result<(), FederationError>;
}

/// Returns the set of bearer tokens acceptable for `(endpoint, method)`, for
/// the non-peer token-based authorization path (§4.D).
pub trait TokenManager: Send + Sync {
    fn acceptable_tokens(&self, endpoint: &str, method: &Method) -> Vec<String>;
}

impl IntoResponse for FederationError {
    fn into_response(self) -> Response {
        let status = match &self {
            FederationError::NotStarted => StatusCode::SERVICE_UNAVAILABLE,
            FederationError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FederationError::Unauthorized => StatusCode::UNAUTHORIZED,
            FederationError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            FederationError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub struct InboxState<R: ActorRetriever> {
    pub verifier: Verifier<R>,
    pub token_manager: Option<Arc<dyn TokenManager>>,
    pub verify_actor_in_signature: bool,
    pub max_body_bytes: usize,
    pub sender: mpsc::Sender<(String, Activity)>,
}

/// Mounts the inbox route at `path` (e.g. `/actor/inbox`), wired per §4.D.
pub fn router<R: ActorRetriever + 'static>(path: &str, state: Arc<InboxState<R>>) -> Router {
    Router::new().route(path, post(receive_activity)).with_state(state)
}

async fn receive_activity<R: ActorRetriever + 'static>(
    State(state): State<Arc<InboxState<R>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, FederationError> {
    if body.len() > state.max_body_bytes {
        return Err(FederationError::BadRequest("request body too large".to_string()));
    }

    let actor_iri = authenticate(&state, &headers, &body).await?;

    let activity: Activity = serde_json::from_slice(&body)
        .map_err(|e| FederationError::BadRequest(format!("malformed activity: {e}")))?;

    if state.verify_actor_in_signature && activity.actor != actor_iri {
        return Err(FederationError::Unauthorized);
    }

    state
        .sender
        .send((actor_iri, activity))
        .await
        .map_err(|e| FederationError::Other(anyhow::anyhow!(e)))?;

    Ok(StatusCode::ACCEPTED)
}

/// §4.D: authenticate via the §4.B verifier; if that fails, fall back to
/// token-based authorization for non-peer endpoints. A request matching
/// neither is rejected 401.
async fn authenticate<R: ActorRetriever + 'static>(
    state: &Arc<InboxState<R>>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<String, FederationError> {
    let mut request = SignableRequest::new(Method::POST, "/");
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            let _ = request.set_header(name.as_str(), v.to_string());
        }
    }
    request = request.with_body(body.to_vec());

    let (ok, actor_iri) = state.verifier.verify_request(&request).await?;
    if ok {
        return Ok(actor_iri.map(|i| i.into_string()).unwrap_or_default());
    }

    if let Some(token_manager) = &state.token_manager {
        if let Some(token) = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            let acceptable = token_manager.acceptable_tokens("inbox", &Method::POST);
            if acceptable.iter().any(|t| t == token) {
                return Ok(String::new());
            }
        }
    }

    warn!("inbox request failed both signature and token authorization");
    Err(FederationError::Unauthorized)
}

/// §4.D step 3-4: a fixed pool of subscribers deserializing/dispatching
/// received activities; each processed message's error classifies into
/// transient (logged, would be nacked by a real broker) or persistent.
pub async fn run_subscriber_pool(
    mut receiver: mpsc::Receiver<(String, Activity)>,
    handler: Arc<dyn ActivityHandler>,
    pool_size: usize,
) {
    let pool_size = pool_size.max(1);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(pool_size));
    while let Some((actor_iri, activity)) = receiver.recv().await {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let handler = handler.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = handler.handle(&actor_iri, activity).await {
                if e.is_transient() {
                    warn!(error = %e, "activity handler failed transiently, would redeliver");
                } else {
                    warn!(error = %e, "activity handler rejected activity, dropping");
                }
            }
        });
    }
}

pub fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

pub fn default_subscriber_pool_size() -> usize {
    DEFAULT_SUBSCRIBER_POOL_SIZE
}
