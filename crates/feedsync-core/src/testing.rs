//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{ApiRequest, Backend};
use crate::channel::{ChannelMessage, EventBridge, EventChannel};
use crate::config::FeedConfig;
use crate::engine::{AuthContext, FeedEngine};
use crate::error::FeedResult;
use crate::models::{Comment, FeedPage, Notification, Post, UserRef};
use crate::store::{FeedMutation, FeedStore, NotificationLedger, SharedFeedStore, SharedLedger};

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn user(id: &str, name: &str) -> UserRef {
    UserRef::new(id, name)
}

pub fn post(id: &str, author_id: &str) -> Post {
    Post {
        id: id.to_string(),
        user: UserRef::id_only(author_id),
        content: String::new(),
        comments: Vec::new(),
        likes: Vec::new(),
        created_at: fixed_time(),
    }
}

pub fn comment(id: &str, post_id: &str, user_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        reply: None,
        user: UserRef::id_only(user_id),
        content: format!("text of {id}"),
        likes: Vec::new(),
        tag: None,
        post_user_id: None,
        created_at: fixed_time(),
    }
}

pub fn reply(id: &str, post_id: &str, parent: &str, user_id: &str) -> Comment {
    Comment {
        reply: Some(parent.to_string()),
        ..comment(id, post_id, user_id)
    }
}

pub fn notification(id: &str, source_id: &str, url: &str) -> Notification {
    Notification {
        id: id.to_string(),
        source_id: source_id.to_string(),
        text: "commented on your post".to_string(),
        recipients: Vec::new(),
        url: url.to_string(),
        content: None,
        is_read: false,
        user: None,
    }
}

/// Backend answering from a per-path script. Unscripted paths succeed with
/// an empty object.
#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<HashMap<String, FeedResult<Value>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockBackend {
    pub fn respond(&self, path: &str, response: FeedResult<Value>) {
        self.responses.lock().insert(path.to_string(), response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.path.clone()).collect()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn send(&self, request: ApiRequest) -> FeedResult<Value> {
        let response = self
            .responses
            .lock()
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| Ok(json!({})));
        self.requests.lock().push(request);
        response
    }
}

/// Channel that keeps everything emitted on it.
#[derive(Default)]
pub struct RecordingChannel {
    messages: Mutex<Vec<ChannelMessage>>,
}

impl RecordingChannel {
    pub fn names(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.name.clone()).collect()
    }

    /// Payloads emitted under `name`, in order.
    pub fn events(&self, name: &str) -> Vec<Value> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.name == name)
            .map(|m| m.payload.clone())
            .collect()
    }
}

impl EventChannel for RecordingChannel {
    fn emit(&self, message: ChannelMessage) {
        self.messages.lock().push(message);
    }
}

pub struct Fixture {
    pub engine: FeedEngine,
    pub store: SharedFeedStore,
    pub ledger: SharedLedger,
    pub backend: Arc<MockBackend>,
    pub channel: Arc<RecordingChannel>,
    pub me: UserRef,
}

impl Fixture {
    pub fn load(&self, posts: Vec<Post>) {
        let result = posts.len() as i64;
        self.store
            .lock()
            .apply(FeedMutation::Loaded(Some(FeedPage { posts, result })));
    }
}

pub fn fixture(config: FeedConfig) -> Fixture {
    let store = Arc::new(Mutex::new(FeedStore::new()));
    let ledger = Arc::new(Mutex::new(NotificationLedger::new()));
    let backend = Arc::new(MockBackend::default());
    let channel = Arc::new(RecordingChannel::default());
    let me = user("me", "me");

    let engine = FeedEngine::new(
        store.clone(),
        ledger.clone(),
        backend.clone(),
        EventBridge::new(channel.clone(), Uuid::new_v4()),
        AuthContext {
            token: "test-token".to_string(),
            profile: me.clone(),
        },
        config,
    );

    Fixture {
        engine,
        store,
        ledger,
        backend,
        channel,
        me,
    }
}
