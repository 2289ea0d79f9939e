//! Applies events emitted by other sessions to this session's stores.
//!
//! Never calls the backend and never re-emits: the originating session has
//! already done both.

use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::channel::{ChannelMessage, FeedEvent};
use crate::store::{SharedFeedStore, SharedLedger};

#[derive(Clone)]
pub struct RemoteIngestor {
    session_id: Uuid,
    user_id: String,
    store: SharedFeedStore,
    ledger: SharedLedger,
}

impl RemoteIngestor {
    pub fn new(
        session_id: Uuid,
        user_id: impl Into<String>,
        store: SharedFeedStore,
        ledger: SharedLedger,
    ) -> Self {
        Self {
            session_id,
            user_id: user_id.into(),
            store,
            ledger,
        }
    }

    /// Handle a message off the channel, dropping our own echoes.
    pub fn on_message(&self, message: ChannelMessage) -> bool {
        if message.origin == self.session_id {
            trace!(event = %message.name, "skipping own event");
            return false;
        }
        self.on_event(&message.name, message.payload)
    }

    /// Returns true when local state changed. Unknown names and malformed
    /// payloads are ignored.
    pub fn on_event(&self, name: &str, payload: Value) -> bool {
        match FeedEvent::from_parts(name, payload) {
            Ok(Some(event)) => self.apply(event),
            Ok(None) => {
                debug!(event = name, "ignoring unknown event");
                false
            }
            Err(e) => {
                warn!(event = name, error = %e, "ignoring malformed event payload");
                false
            }
        }
    }

    pub fn apply(&self, event: FeedEvent) -> bool {
        if let FeedEvent::CreateNotify(n) = &event {
            if !n.is_for(&self.user_id) {
                return false;
            }
        }

        let mut changed = false;
        if let Some(mutation) = event.feed_mutation() {
            // A post we do not hold stays absent: Replace never inserts
            changed |= self.store.lock().apply(mutation);
        }
        if let Some(mutation) = event.ledger_mutation() {
            changed |= self.ledger.lock().apply(mutation);
        }
        trace!(event = event.name(), changed, "remote event applied");
        changed
    }

    /// Drain the channel until it closes. Lagged receivers skip what they
    /// missed; those posts stay stale until the next full fetch.
    pub async fn run(self, mut rx: broadcast::Receiver<ChannelMessage>) {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    self.on_message(message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event receiver lagged, updates lost");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(session = %self.session_id, "event channel closed");
    }
}
