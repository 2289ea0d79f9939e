//! One signed-in user's view of the feed.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::backend::Backend;
use crate::channel::{ChannelMessage, EventBridge, EventChannel};
use crate::config::FeedConfig;
use crate::engine::{AuthContext, FeedEngine};
use crate::ingest::RemoteIngestor;
use crate::models::{Notification, Post};
use crate::store::{FeedStore, NotificationLedger, SharedFeedStore, SharedLedger, UnreadBadge};

/// Owns the stores of a session and the two writers allowed to touch them:
/// the engine for local intents and the ingestor for remote events.
pub struct FeedSession {
    id: Uuid,
    store: SharedFeedStore,
    ledger: SharedLedger,
    engine: FeedEngine,
    ingestor: RemoteIngestor,
}

impl FeedSession {
    pub fn new(
        config: FeedConfig,
        auth: AuthContext,
        backend: Arc<dyn Backend>,
        channel: Arc<dyn EventChannel>,
    ) -> Self {
        let id = Uuid::new_v4();
        let store = Arc::new(Mutex::new(FeedStore::new()));
        let ledger = Arc::new(Mutex::new(NotificationLedger::new()));

        let user_id = auth.profile.id.clone();
        let ingestor = RemoteIngestor::new(id, user_id, store.clone(), ledger.clone());
        let engine = FeedEngine::new(
            store.clone(),
            ledger.clone(),
            backend,
            EventBridge::new(channel, id),
            auth,
            config,
        );

        info!(session = %id, user = %engine.profile().id, "feed session created");
        Self {
            id,
            store,
            ledger,
            engine,
            ingestor,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &FeedEngine {
        &self.engine
    }

    pub fn ingestor(&self) -> &RemoteIngestor {
        &self.ingestor
    }

    pub fn store(&self) -> SharedFeedStore {
        self.store.clone()
    }

    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    // ===== Snapshots =====

    pub fn posts(&self) -> Vec<Post> {
        self.store.lock().posts().to_vec()
    }

    pub fn post(&self, id: &str) -> Option<Post> {
        self.store.lock().post(id).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.ledger.lock().entries().to_vec()
    }

    pub fn unread_badge(&self) -> UnreadBadge {
        self.ledger.lock().badge()
    }

    /// Run the ingest loop for `rx` on the current tokio runtime.
    pub fn spawn_ingest(&self, rx: broadcast::Receiver<ChannelMessage>) -> JoinHandle<()> {
        tokio::spawn(self.ingestor.clone().run(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelHub;
    use crate::engine::MutationIntent;
    use crate::models::FeedPage;
    use crate::store::{FeedMutation, LedgerMutation};
    use crate::testing::{comment, notification, post, reply, user, MockBackend};
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    fn session(hub: &ChannelHub, backend: &Arc<MockBackend>, user_id: &str) -> FeedSession {
        let session = FeedSession::new(
            FeedConfig::default(),
            AuthContext {
                token: format!("token-{user_id}"),
                profile: user(user_id, user_id),
            },
            backend.clone(),
            Arc::new(hub.clone()),
        );
        session.store().lock().apply(FeedMutation::Loaded(Some(FeedPage {
            posts: vec![post("P1", "author"), post("P2", "author")],
            result: 2,
        })));
        session
    }

    fn pump(session: &FeedSession, rx: &mut broadcast::Receiver<ChannelMessage>) -> usize {
        let mut applied = 0;
        loop {
            match rx.try_recv() {
                Ok(message) => {
                    if session.ingestor().on_message(message) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return applied,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_like_converges_across_sessions() {
        let hub = ChannelHub::new(16);
        let backend = Arc::new(MockBackend::default());
        let alice = session(&hub, &backend, "alice");
        let bob = session(&hub, &backend, "bob");
        let mut alice_rx = hub.subscribe();
        let mut bob_rx = hub.subscribe();

        let target = alice.post("P1").unwrap();
        let me = alice.engine().profile().clone();
        alice.engine().apply(MutationIntent::like(&me, &target)).await.unwrap();

        assert_eq!(pump(&alice, &mut alice_rx), 0, "own echo is dropped");
        assert_eq!(pump(&bob, &mut bob_rx), 1);
        assert_eq!(alice.posts(), bob.posts());
        assert!(bob.post("P1").unwrap().is_liked_by("alice"));
    }

    fn with_thread(session: &FeedSession) {
        let mut p1 = post("P1", "author");
        p1.comments = vec![
            comment("c1", "P1", "carol"),
            reply("c2", "P1", "c1", "dave"),
            reply("c3", "P1", "c1", "erin"),
            comment("c4", "P1", "carol"),
        ];
        session.store().lock().apply(FeedMutation::Replace(p1));
    }

    #[tokio::test]
    async fn test_comment_cascade_converges_across_sessions() {
        let hub = ChannelHub::new(16);
        let backend = Arc::new(MockBackend::default());
        let alice = session(&hub, &backend, "alice");
        let bob = session(&hub, &backend, "bob");
        with_thread(&alice);
        with_thread(&bob);
        let bob_ledger = bob.ledger();
        for id in ["c1", "c2", "c3", "c4"] {
            let n = notification(&format!("n-{id}"), id, "/post/P1");
            bob_ledger.lock().apply(LedgerMutation::Insert(n));
        }
        let mut bob_rx = hub.subscribe();

        let p1 = alice.post("P1").unwrap();
        let target = p1.comment("c1").cloned().unwrap();
        let me = alice.engine().profile().clone();
        let outcome = alice
            .engine()
            .apply(MutationIntent::remove_comment(&me, &p1, &target))
            .await;
        outcome.unwrap();

        // Three deleteNotify events plus one deleteComment
        assert_eq!(pump(&bob, &mut bob_rx), 4);
        let remaining: Vec<_> = bob
            .post("P1")
            .unwrap()
            .comments
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(remaining, vec!["c4"]);
        assert_eq!(bob.posts(), alice.posts());

        let sources: Vec<_> = bob.notifications().iter().map(|n| n.source_id.clone()).collect();
        assert_eq!(sources, vec!["c4"]);
    }

    #[tokio::test]
    async fn test_created_comment_reaches_peers_with_server_id() {
        let hub = ChannelHub::new(16);
        let backend = Arc::new(MockBackend::default());
        backend.respond(
            "comment",
            Ok(json!({ "newComment": { "_id": "srv-9", "postId": "P2", "user": "alice" } })),
        );
        let alice = session(&hub, &backend, "alice");
        let bob = session(&hub, &backend, "bob");
        let mut bob_rx = hub.subscribe();

        let p2 = alice.post("P2").unwrap();
        let me = alice.engine().profile().clone();
        alice.engine().apply(MutationIntent::comment(&me, &p2, "hi")).await.unwrap();

        assert_eq!(pump(&bob, &mut bob_rx), 1);
        let comments = bob.post("P2").unwrap().comments;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, "srv-9");
        assert_eq!(comments[0].user.id, "alice");
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_reach_peers() {
        let hub = ChannelHub::new(16);
        let backend = Arc::new(MockBackend::default());
        backend.respond("posts/P2/like", Err(crate::error::FeedError::rejected("no")));
        let alice = session(&hub, &backend, "alice");
        let bob = session(&hub, &backend, "bob");
        let mut bob_rx = hub.subscribe();

        let target = alice.post("P2").unwrap();
        let me = alice.engine().profile().clone();
        alice.engine().apply(MutationIntent::like(&me, &target)).await.unwrap_err();

        assert_eq!(pump(&bob, &mut bob_rx), 0);
        assert!(!bob.post("P2").unwrap().is_liked_by("alice"));
    }

    #[tokio::test]
    async fn test_spawned_ingest_applies_remote_events() {
        let hub = ChannelHub::new(16);
        let backend = Arc::new(MockBackend::default());
        let alice = session(&hub, &backend, "alice");
        let bob = session(&hub, &backend, "bob");
        let task = bob.spawn_ingest(hub.subscribe());

        let target = alice.post("P2").unwrap();
        let me = alice.engine().profile().clone();
        alice.engine().apply(MutationIntent::like(&me, &target)).await.unwrap();

        for _ in 0..100 {
            if bob.post("P2").unwrap().is_liked_by("alice") {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(bob.post("P2").unwrap().is_liked_by("alice"));
        task.abort();
    }

    #[test]
    fn test_badge_reflects_ledger() {
        let hub = ChannelHub::new(4);
        let backend = Arc::new(MockBackend::default());
        let s = session(&hub, &backend, "alice");
        assert_eq!(s.unread_badge().to_string(), "0");
    }
}
