use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Comment, UserRef};

/// Denormalized post as read by the rest of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: UserRef,
    #[serde(default)]
    pub content: String,
    /// Insertion order, stable across reconciliation
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Liker identities are unique
    #[serde(default)]
    pub likes: Vec<UserRef>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|u| u.id == user_id)
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn replies_to<'a>(&'a self, comment_id: &'a str) -> impl Iterator<Item = &'a Comment> {
        self.comments
            .iter()
            .filter(move |c| c.reply.as_deref() == Some(comment_id))
    }

    /// Client route of this post, also the notification target URL.
    pub fn url(&self) -> String {
        format!("/post/{}", self.id)
    }
}

/// One page of posts plus the server-reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub result: i64,
}
