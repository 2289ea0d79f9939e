use serde::{Deserialize, Serialize};

/// Entry of the notification ledger.
///
/// `id` is the storage identity; `source_id` is the correlation key of the
/// entity that caused it (a comment, a post), which together with `url`
/// identifies the notification across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "id")]
    pub source_id: String,
    pub text: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<NotificationSender>,
}

impl Notification {
    pub fn is_for(&self, user_id: &str) -> bool {
        self.recipients.is_empty() || self.recipients.iter().any(|r| r == user_id)
    }

    pub fn matches_key(&self, source_id: &str, url: &str) -> bool {
        self.source_id == source_id && self.url == url
    }
}

/// Display snapshot of whoever triggered a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSender {
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Payload sent to create a notification, and the correlation key used to
/// delete one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyMessage {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
