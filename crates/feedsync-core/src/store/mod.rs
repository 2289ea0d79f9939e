pub mod feed_store;
pub mod notification_ledger;

use std::sync::Arc;

use parking_lot::Mutex;

pub use feed_store::{FeedMutation, FeedStore};
pub use notification_ledger::{LedgerMutation, NotificationLedger, UnreadBadge};

/// Feed store shared between the engine, the ingestor and readers.
/// Every write goes through `FeedStore::apply` under this lock; the lock is
/// never held across an await.
pub type SharedFeedStore = Arc<Mutex<FeedStore>>;

pub type SharedLedger = Arc<Mutex<NotificationLedger>>;
