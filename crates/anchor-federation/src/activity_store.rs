use std::sync::Arc;

use anchor_store::{BatchOp, KvStore, Tag};
use anchor_vocab::Activity;

use crate::error::FederationResult;

/// The reference collections an activity can be filed under (§4.C.5, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Inbox,
    Outbox,
    PublicOutbox,
    Follower,
    Following,
    Witness,
    Witnessing,
    Liked,
    Likes,
    Share,
}

impl ReferenceKind {
    fn tag_name(self) -> &'static str {
        match self {
            ReferenceKind::Inbox => "inbox",
            ReferenceKind::Outbox => "outbox",
            ReferenceKind::PublicOutbox => "public-outbox",
            ReferenceKind::Follower => "follower",
            ReferenceKind::Following => "following",
            ReferenceKind::Witness => "witness",
            ReferenceKind::Witnessing => "witnessing",
            ReferenceKind::Liked => "liked",
            ReferenceKind::Likes => "likes",
            ReferenceKind::Share => "share",
        }
    }
}

/// Thin wrapper over `anchor-store::KvStore` fixing the key/tag layout used
/// for activities and their reference collections (§4.C.5, §4.C.3).
pub struct ActivityStore<S: KvStore> {
    store: Arc<S>,
}

impl<S: KvStore> ActivityStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist `activity` under its own id.
    pub async fn put_activity(&self, activity: &Activity) -> FederationResult<()> {
        let id = activity.id.as_deref().expect("activity id must be set before storing");
        let value = serde_json::to_vec(activity).map_err(|e| anyhow::anyhow!(e))?;
        self.store.put(id, value, vec![]).await?;
        Ok(())
    }

    pub async fn get_activity(&self, id: &str) -> FederationResult<Option<Activity>> {
        match self.store.get(id).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| anyhow::anyhow!(e))?)),
            None => Ok(None),
        }
    }

    /// Add `member_iri` under `kind` for `owner_iri` (e.g. a Follower of an
    /// actor, or an Outbox entry tagged by activity type).
    pub async fn add_reference(
        &self,
        owner_iri: &str,
        kind: ReferenceKind,
        member_iri: &str,
        type_tag: Option<&str>,
    ) -> FederationResult<()> {
        let key = format!("ref:{}:{}:{}", kind.tag_name(), owner_iri, member_iri);
        let mut tags = vec![Tag::new("owner", owner_iri)];
        if let Some(t) = type_tag {
            tags.push(Tag::new("type", t));
        }
        self.store.put(&key, member_iri.as_bytes().to_vec(), tags).await?;
        Ok(())
    }

    /// List the members of `owner_iri`'s `kind` collection, bounded by
    /// `max` (§4.C.3: "bounded by MaxRecipients").
    pub async fn list_references(
        &self,
        owner_iri: &str,
        kind: ReferenceKind,
        max: usize,
    ) -> FederationResult<Vec<String>> {
        let rows = self.store.query(&format!("owner:{owner_iri}")).await?;
        let prefix = format!("ref:{}:{}:", kind.tag_name(), owner_iri);
        Ok(rows
            .into_iter()
            .filter(|r| r.key.starts_with(&prefix))
            .take(max)
            .map(|r| String::from_utf8_lossy(&r.value).into_owned())
            .collect())
    }

    pub async fn remove_reference(
        &self,
        owner_iri: &str,
        kind: ReferenceKind,
        member_iri: &str,
    ) -> FederationResult<()> {
        let key = format!("ref:{}:{}:{}", kind.tag_name(), owner_iri, member_iri);
        self.store.batch(vec![BatchOp::delete(key)]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_store::InMemoryStore;
    use anchor_vocab::{ActivityKind, ActivityObject};

    #[tokio::test]
    async fn activities_round_trip_by_id() {
        let store = ActivityStore::new(Arc::new(InMemoryStore::new()));
        let mut activity = Activity::new(
            ActivityKind::Follow,
            "https://a.example/actor",
            ActivityObject::Iri("https://b.example/actor".to_string()),
        );
        activity.ensure_id("https://a.example/actor");
        store.put_activity(&activity).await.unwrap();

        let fetched = store.get_activity(activity.id.as_deref().unwrap()).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn references_are_listed_by_owner_and_kind() {
        let store = ActivityStore::new(Arc::new(InMemoryStore::new()));
        store
            .add_reference("https://a.example/actor", ReferenceKind::Follower, "https://b.example/actor", None)
            .await
            .unwrap();
        store
            .add_reference("https://a.example/actor", ReferenceKind::Outbox, "https://a.example/activities/1", Some("Follow"))
            .await
            .unwrap();

        let followers = store
            .list_references("https://a.example/actor", ReferenceKind::Follower, 10)
            .await
            .unwrap();
        assert_eq!(followers, vec!["https://b.example/actor".to_string()]);
    }

    #[tokio::test]
    async fn remove_reference_drops_the_entry() {
        let store = ActivityStore::new(Arc::new(InMemoryStore::new()));
        store
            .add_reference("https://a.example/actor", ReferenceKind::Following, "https://b.example/actor", None)
            .await
            .unwrap();
        store
            .remove_reference("https://a.example/actor", ReferenceKind::Following, "https://b.example/actor")
            .await
            .unwrap();
        let following = store
            .list_references("https://a.example/actor", ReferenceKind::Following, 10)
            .await
            .unwrap();
        assert!(following.is_empty());
    }
}
