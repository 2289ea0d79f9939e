use std::collections::HashSet;
use std::fmt;

use crate::constants::UNREAD_DISPLAY_THRESHOLD;
use crate::models::Notification;

/// A single transition of the notification ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerMutation {
    /// Prepend (most recent first); ignored if the identity is already present
    Insert(Notification),
    /// Drop every entry with this correlation key
    RemoveByKey { source_id: String, url: String },
    MarkRead { id: String },
    Clear,
    Replace(Vec<Notification>),
}

/// Unread-notification feed plus read bookkeeping.
pub struct NotificationLedger {
    entries: Vec<Notification>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    // ===== Getters =====

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Derived on every call, never stored.
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.is_read).count()
    }

    pub fn badge(&self) -> UnreadBadge {
        UnreadBadge::from_count(self.unread_count())
    }

    // ===== Mutations =====

    pub fn apply(&mut self, mutation: LedgerMutation) -> bool {
        match mutation {
            LedgerMutation::Insert(notification) => {
                if self.contains(&notification.id) {
                    return false;
                }
                self.entries.insert(0, notification);
                true
            }
            LedgerMutation::RemoveByKey { source_id, url } => {
                let before = self.entries.len();
                self.entries.retain(|n| !n.matches_key(&source_id, &url));
                self.entries.len() != before
            }
            LedgerMutation::MarkRead { id } => {
                match self.entries.iter_mut().find(|n| n.id == id) {
                    // Read never reverts to unread
                    Some(n) if !n.is_read => {
                        n.is_read = true;
                        true
                    }
                    _ => false,
                }
            }
            LedgerMutation::Clear => {
                let changed = !self.entries.is_empty();
                self.entries.clear();
                changed
            }
            LedgerMutation::Replace(entries) => {
                let mut seen = HashSet::new();
                self.entries = entries
                    .into_iter()
                    .filter(|n| seen.insert(n.id.clone()))
                    .collect();
                true
            }
        }
    }
}

impl Default for NotificationLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Display form of the unread count: exact up to the threshold, then "5+".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadBadge {
    Count(usize),
    MoreThan(usize),
}

impl UnreadBadge {
    pub fn from_count(count: usize) -> Self {
        if count > UNREAD_DISPLAY_THRESHOLD {
            UnreadBadge::MoreThan(UNREAD_DISPLAY_THRESHOLD)
        } else {
            UnreadBadge::Count(count)
        }
    }
}

impl fmt::Display for UnreadBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreadBadge::Count(n) => write!(f, "{}", n),
            UnreadBadge::MoreThan(n) => write!(f, "{}+", n),
        }
    }
}
