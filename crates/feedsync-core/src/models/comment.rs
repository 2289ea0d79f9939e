use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserRef;

/// A comment inside a post's thread. `reply` points at a top-level comment;
/// threads are two levels deep, never more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub user: UserRef,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<UserRef>,
    /// User being answered, used to route reply notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.reply.is_some()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|u| u.id == user_id)
    }
}
