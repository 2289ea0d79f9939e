//! Realtime event channel: the outbound bridge and the in-process hub.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::events;
use crate::models::{Notification, NotifyMessage, Post};
use crate::store::{FeedMutation, LedgerMutation};

/// Named events carried between sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    CreateNotify(Notification),
    DeleteNotify(NotifyMessage),
    LikePost(Post),
    UnlikePost(Post),
    CreateComment(Post),
    DeleteComment(Post),
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::CreateNotify(_) => events::CREATE_NOTIFY,
            FeedEvent::DeleteNotify(_) => events::DELETE_NOTIFY,
            FeedEvent::LikePost(_) => events::LIKE_POST,
            FeedEvent::UnlikePost(_) => events::UNLIKE_POST,
            FeedEvent::CreateComment(_) => events::CREATE_COMMENT,
            FeedEvent::DeleteComment(_) => events::DELETE_COMMENT,
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<Value> {
        match self {
            FeedEvent::CreateNotify(n) => serde_json::to_value(n),
            FeedEvent::DeleteNotify(msg) => serde_json::to_value(msg),
            FeedEvent::LikePost(post)
            | FeedEvent::UnlikePost(post)
            | FeedEvent::CreateComment(post)
            | FeedEvent::DeleteComment(post) => serde_json::to_value(post),
        }
    }

    /// Parse a named payload. Unknown names yield `Ok(None)`.
    pub fn from_parts(name: &str, payload: Value) -> serde_json::Result<Option<Self>> {
        let event = match name {
            events::CREATE_NOTIFY => FeedEvent::CreateNotify(serde_json::from_value(payload)?),
            events::DELETE_NOTIFY => FeedEvent::DeleteNotify(serde_json::from_value(payload)?),
            events::LIKE_POST => FeedEvent::LikePost(serde_json::from_value(payload)?),
            events::UNLIKE_POST => FeedEvent::UnlikePost(serde_json::from_value(payload)?),
            events::CREATE_COMMENT => FeedEvent::CreateComment(serde_json::from_value(payload)?),
            events::DELETE_COMMENT => FeedEvent::DeleteComment(serde_json::from_value(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Feed-store transition this event stands for.
    pub fn feed_mutation(&self) -> Option<FeedMutation> {
        match self {
            FeedEvent::LikePost(post)
            | FeedEvent::UnlikePost(post)
            | FeedEvent::CreateComment(post)
            | FeedEvent::DeleteComment(post) => Some(FeedMutation::Replace(post.clone())),
            FeedEvent::CreateNotify(_) | FeedEvent::DeleteNotify(_) => None,
        }
    }

    /// Ledger transition this event stands for.
    pub fn ledger_mutation(&self) -> Option<LedgerMutation> {
        match self {
            FeedEvent::CreateNotify(n) => Some(LedgerMutation::Insert(n.clone())),
            FeedEvent::DeleteNotify(msg) => Some(LedgerMutation::RemoveByKey {
                source_id: msg.id.clone(),
                url: msg.url.clone(),
            }),
            _ => None,
        }
    }
}

/// What actually travels on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Session that emitted the event
    pub origin: Uuid,
    pub name: String,
    pub payload: Value,
}

/// Publish side of the realtime transport. Delivery is best effort: no
/// acknowledgement, no retry, failures are dropped.
pub trait EventChannel: Send + Sync {
    fn emit(&self, message: ChannelMessage);
}

/// Outbound bridge used by the engine after a successful mutation.
#[derive(Clone)]
pub struct EventBridge {
    channel: Arc<dyn EventChannel>,
    origin: Uuid,
}

impl EventBridge {
    pub fn new(channel: Arc<dyn EventChannel>, origin: Uuid) -> Self {
        Self { channel, origin }
    }

    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn emit(&self, event: &FeedEvent) {
        match event.to_payload() {
            Ok(payload) => {
                debug!(event = event.name(), "broadcasting");
                self.channel.emit(ChannelMessage {
                    origin: self.origin,
                    name: event.name().to_string(),
                    payload,
                });
            }
            Err(e) => warn!(event = event.name(), error = %e, "failed to encode event, dropped"),
        }
    }
}

/// In-process channel connecting every session that subscribed to it.
#[derive(Clone)]
pub struct ChannelHub {
    tx: broadcast::Sender<ChannelMessage>,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.tx.subscribe()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(crate::constants::HUB_CAPACITY)
    }
}

impl EventChannel for ChannelHub {
    fn emit(&self, message: ChannelMessage) {
        if self.tx.send(message).is_err() {
            debug!("no connected sessions, event dropped");
        }
    }
}

/// Channel for headless use without a realtime transport: logs and drops.
pub struct TracingChannel;

impl EventChannel for TracingChannel {
    fn emit(&self, message: ChannelMessage) {
        debug!(event = %message.name, "no realtime transport, event dropped");
    }
}
