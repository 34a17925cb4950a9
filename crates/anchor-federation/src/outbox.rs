use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anchor_common::PUBLIC_IRI;
use anchor_store::KvStore;
use anchor_vocab::Activity;
use tokio::sync::mpsc;
use tracing::warn;

use crate::activity_store::{ActivityStore, ReferenceKind};
use crate::directory::ActorDirectory;
use crate::error::{FederationError, FederationResult};
use crate::iri_cache::IriResolutionCache;
use crate::lifecycle::Lifecycle;
use crate::message::OutboxMessage;

const DEFAULT_MAX_RECIPIENTS: usize = 1000;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Config knobs named in §4.C, with the spec's stated defaults.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub max_recipients: usize,
    pub max_concurrent_requests: usize,
    pub max_retries: u32,
    pub followers_path: String,
    pub witnesses_path: String,
}

impl OutboxConfig {
    pub fn new(service_iri: &str) -> Self {
        Self {
            max_recipients: DEFAULT_MAX_RECIPIENTS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_retries: DEFAULT_MAX_RETRIES,
            followers_path: format!("{service_iri}/followers"),
            witnesses_path: format!("{service_iri}/witnesses"),
        }
    }
}

/// Invoked when a transient delivery failure exhausts `max_retries`
/// (§4.C.6: "the activity is surfaced to an undeliverable-handler").
pub trait UndeliverableHandler: Send + Sync {
    fn handle(&self, activity_id: &str, target_iri: &str);
}

pub struct Outbox<S: KvStore, D: ActorDirectory> {
    service_iri: String,
    config: OutboxConfig,
    lifecycle: Lifecycle,
    activity_store: ActivityStore<S>,
    directory: Arc<IriResolutionCache<D>>,
    http: reqwest::Client,
    sender: mpsc::UnboundedSender<OutboxMessage>,
    receiver: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<OutboxMessage>>>,
    undeliverable_handler: Option<Arc<dyn UndeliverableHandler>>,
}

impl<S: KvStore, D: ActorDirectory> Outbox<S, D> {
    pub fn new(
        service_iri: impl Into<String>,
        store: Arc<S>,
        directory: Arc<IriResolutionCache<D>>,
        http: reqwest::Client,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let service_iri = service_iri.into();
        Self {
            config: OutboxConfig::new(&service_iri),
            service_iri,
            lifecycle: Lifecycle::new(),
            activity_store: ActivityStore::new(store),
            directory,
            http,
            sender,
            receiver: tokio::sync::Mutex::new(Some(receiver)),
            undeliverable_handler: None,
        }
    }

    pub fn with_undeliverable_handler(mut self, handler: Arc<dyn UndeliverableHandler>) -> Self {
        self.undeliverable_handler = Some(handler);
        self
    }

    pub fn start(&self) {
        self.lifecycle.start();
    }

    /// Stops accepting new work and cancels the lifecycle token so `run()`
    /// wakes and returns (§5: "shutting down waits for in-flight deliveries
    /// up to a drain window" — each delivery already carries its own
    /// per-request timeout, so the wait here is for the currently
    /// dispatched batch to finish, not a second deadline).
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    /// `Post(activity, excludeIRIs?) -> activityIRI` (§4.C.1).
    pub async fn post(&self, mut activity: Activity, exclude_iris: Vec<String>) -> FederationResult<String> {
        if !self.lifecycle.is_started() {
            return Err(FederationError::NotStarted);
        }
        if !activity.actor_matches(&self.service_iri) {
            return Err(FederationError::BadRequest("activity.actor must equal the service IRI".to_string()));
        }
        let id = activity.ensure_id(&self.service_iri).to_string();

        self.activity_store.put_activity(&activity).await?;
        let type_tag = format!("{:?}", activity.kind);
        self.activity_store
            .add_reference(&self.service_iri, ReferenceKind::Outbox, &id, Some(&type_tag))
            .await?;
        if activity.addresses_public() {
            self.activity_store
                .add_reference(&self.service_iri, ReferenceKind::PublicOutbox, &id, Some(&type_tag))
                .await?;
        }

        self.sender
            .send(OutboxMessage::Broadcast { activity, exclude_iris })
            .map_err(|e| FederationError::Other(anyhow::anyhow!(e)))?;
        Ok(id)
    }

    /// §4.C.3: resolve every IRI in `activity.to` to concrete inbox IRIs.
    async fn resolve_recipients(&self, activity: &Activity, exclude_iris: &[String]) -> Vec<String> {
        let mut seen: HashSet<String> = exclude_iris.iter().cloned().collect();
        let mut recipients = Vec::new();

        for iri in &activity.to {
            if iri == PUBLIC_IRI || iri == &self.service_iri {
                continue;
            }
            let expanded = if *iri == self.config.followers_path {
                self.activity_store
                    .list_references(&self.service_iri, ReferenceKind::Follower, self.config.max_recipients)
                    .await
                    .unwrap_or_default()
            } else if *iri == self.config.witnesses_path {
                self.activity_store
                    .list_references(&self.service_iri, ReferenceKind::Witness, self.config.max_recipients)
                    .await
                    .unwrap_or_default()
            } else {
                match self.directory.resolve(iri).await {
                    Ok(iris) => (*iris).clone(),
                    Err(e) => {
                        warn!(iri, error = %e, "recipient resolution failed");
                        Vec::new()
                    }
                }
            };
            for candidate in expanded {
                if seen.insert(candidate.clone()) {
                    recipients.push(candidate);
                }
            }
        }
        recipients
    }

    /// §4.C.4: dispatch resolution across a bounded worker pool, then
    /// deliver to each resolved inbox.
    async fn broadcast(&self, activity: Activity, exclude_iris: Vec<String>) {
        let recipients = self.resolve_recipients(&activity, &exclude_iris).await;
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent_requests));
        let mut tasks = Vec::new();
        for target in recipients {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let activity = activity.clone();
            let http = self.http.clone();
            let max_retries = self.config.max_retries;
            let undeliverable = self.undeliverable_handler.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                deliver_with_retry(&http, &activity, &target, max_retries, undeliverable).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Drains queued messages; intended to be run as a background task.
    /// Returns once `stop()` has been called and no message is immediately
    /// available, so a caller can `tokio::spawn(outbox.run())` and rely on
    /// `stop()` to unwind it rather than waiting for the sender to drop.
    pub async fn run(&self) {
        let mut receiver = self.receiver.lock().await.take().expect("run called more than once");
        let cancellation = self.lifecycle.cancellation();
        loop {
            let message = tokio::select! {
                biased;
                message = receiver.recv() => message,
                _ = cancellation.cancelled() => receiver.try_recv().ok(),
            };
            let Some(message) = message else {
                break;
            };
            match message {
                OutboxMessage::Broadcast { activity, exclude_iris } => {
                    self.broadcast(activity, exclude_iris).await;
                }
                OutboxMessage::ResolveAndDeliver { activity, target_iri, .. } => {
                    deliver_with_retry(&self.http, &activity, &target_iri, self.config.max_retries, self.undeliverable_handler.clone()).await;
                }
                OutboxMessage::Deliver { activity, target_iri } => {
                    deliver_with_retry(&self.http, &activity, &target_iri, self.config.max_retries, self.undeliverable_handler.clone()).await;
                }
            }
        }
    }
}

/// One inbox POST with headers `Accept: application/activity+json` and a
/// message-UUID header (§4.C.4); 5xx/transport errors retry with backoff up
/// to `max_retries`, 4xx is logged at Warn and dropped (§4.C.6).
async fn deliver_with_retry(
    http: &reqwest::Client,
    activity: &Activity,
    target_iri: &str,
    max_retries: u32,
    undeliverable: Option<Arc<dyn UndeliverableHandler>>,
) {
    let mut attempt = 0;
    loop {
        match deliver_once(http, activity, target_iri).await {
            Ok(()) => return,
            Err(e) if e.is_transient() => {
                attempt += 1;
                if attempt > max_retries {
                    if let Some(handler) = &undeliverable {
                        handler.handle(activity.id.as_deref().unwrap_or(""), target_iri);
                    }
                    return;
                }
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt.min(10)));
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                warn!(target_iri, error = %e, "activity delivery rejected, dropping");
                return;
            }
        }
    }
}

async fn deliver_once(http: &reqwest::Client, activity: &Activity, target_iri: &str) -> FederationResult<()> {
    let body = serde_json::to_vec(activity).map_err(|e| anyhow::anyhow!(e))?;
    let response = http
        .post(target_iri)
        .header("Accept", "application/activity+json")
        .header("Message-Uuid", uuid::Uuid::new_v4().to_string())
        .body(body)
        .send()
        .await?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(FederationError::from_status(response.status()))
    }
}
