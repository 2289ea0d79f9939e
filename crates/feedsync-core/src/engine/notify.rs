//! Notification side effects. These never fail the mutation that triggered
//! them: errors are logged and swallowed.

use serde::Deserialize;
use tracing::{debug, warn};

use super::FeedEngine;
use crate::backend::ApiRequest;
use crate::channel::FeedEvent;
use crate::constants::{paths, COMMENT_NOTIFY_TEXT, REPLY_NOTIFY_TEXT};
use crate::error::FeedResult;
use crate::models::{Comment, Notification, NotificationSender, NotifyMessage, Post};
use crate::normalize::decode_field;
use crate::store::LedgerMutation;

/// Notification tied to `comment`: replies notify the tagged user, top-level
/// comments notify the post author.
pub fn comment_notice(post: &Post, comment: &Comment) -> NotifyMessage {
    let (text, recipient) = match (comment.is_reply(), &comment.tag) {
        (true, Some(tag)) => (REPLY_NOTIFY_TEXT, tag.id.clone()),
        (true, None) => (REPLY_NOTIFY_TEXT, post.user.id.clone()),
        (false, _) => (COMMENT_NOTIFY_TEXT, post.user.id.clone()),
    };
    NotifyMessage {
        id: comment.id.clone(),
        text: text.to_string(),
        recipients: vec![recipient],
        url: post.url(),
        content: Some(post.content.clone()).filter(|c| !c.is_empty()),
    }
}

/// Stored notification as the backend returns it. The sender is populated
/// locally, so whatever the server puts in `user` is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerNotification {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "id", default)]
    source_id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    recipients: Vec<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    is_read: bool,
    #[serde(default)]
    user: serde_json::Value,
}

impl ServerNotification {
    fn into_notification(self, sender: Option<NotificationSender>) -> Notification {
        let sender = sender.or_else(|| serde_json::from_value(self.user).ok());
        Notification {
            id: self.id,
            source_id: self.source_id,
            text: self.text,
            recipients: self.recipients,
            url: self.url,
            content: self.content,
            is_read: self.is_read,
            user: sender,
        }
    }
}

impl FeedEngine {
    fn sender(&self) -> NotificationSender {
        let profile = self.profile();
        NotificationSender {
            user_name: profile.user_name.clone(),
            avatar: profile.avatar.clone(),
        }
    }

    /// Store a notification and push it to its recipients.
    pub async fn create_notify(&self, msg: NotifyMessage) -> Option<Notification> {
        let body = match serde_json::to_value(&msg) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode notification");
                return None;
            }
        };
        let request = ApiRequest::create(paths::NOTIFY, body, self.token());
        let created = self
            .backend
            .send(request)
            .await
            .and_then(|body| decode_field::<ServerNotification>(&body, "notify"));

        match created {
            Ok(server) => {
                let notification = server.into_notification(Some(self.sender()));
                debug!(id = %notification.id, url = %notification.url, "notification created");
                self.bridge.emit(&FeedEvent::CreateNotify(notification.clone()));
                Some(notification)
            }
            Err(e) => {
                warn!(source = %msg.id, error = %e, "notification not created");
                None
            }
        }
    }

    /// Delete by correlation key and tell the recipients to drop it.
    pub async fn delete_notify(&self, msg: NotifyMessage) -> bool {
        let request = ApiRequest::delete(format!("{}/{}", paths::NOTIFY, msg.id), self.token())
            .with_query("url", msg.url.clone());
        match self.backend.send(request).await {
            Ok(_) => {
                self.bridge.emit(&FeedEvent::DeleteNotify(msg));
                true
            }
            Err(e) => {
                warn!(source = %msg.id, error = %e, "notification not deleted");
                false
            }
        }
    }

    /// Mark one entry read locally, then persist it.
    pub async fn mark_read(&self, id: &str) -> bool {
        self.ledger.lock().apply(LedgerMutation::MarkRead { id: id.to_string() });
        let request = ApiRequest::update(format!("{}/{}", paths::IS_READ_NOTIFY, id), self.token());
        match self.backend.send(request).await {
            Ok(_) => true,
            Err(e) => {
                warn!(id, error = %e, "read flag not persisted");
                false
            }
        }
    }

    pub async fn delete_all_notifies(&self) -> bool {
        let request = ApiRequest::delete(paths::DELETE_ALL_NOTIFY, self.token());
        match self.backend.send(request).await {
            Ok(_) => {
                self.ledger.lock().apply(LedgerMutation::Clear);
                true
            }
            Err(e) => {
                warn!(error = %e, "notifications not cleared");
                false
            }
        }
    }

    /// Replace the ledger with the server's list. Returns the entry count.
    pub async fn fetch_notifies(&self) -> FeedResult<usize> {
        let request = ApiRequest::fetch(paths::NOTIFIES, self.token());
        let body = self.backend.send(request).await?;
        let server: Vec<ServerNotification> = decode_field(&body, "notifies")?;
        let entries: Vec<Notification> = server
            .into_iter()
            .map(|n| n.into_notification(None))
            .collect();
        let count = entries.len();
        self.ledger.lock().apply(LedgerMutation::Replace(entries));
        debug!(count, "notifications loaded");
        Ok(count)
    }

    /// Notify about a freshly confirmed comment. Failures only reach the log.
    pub async fn notify_comment(&self, post: &Post, comment: &Comment) -> Option<Notification> {
        self.create_notify(comment_notice(post, comment)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Verb;
    use crate::config::FeedConfig;
    use crate::error::FeedError;
    use crate::store::LedgerMutation;
    use crate::testing::{comment, fixture, notification, post, reply, user};
    use serde_json::json;

    #[test]
    fn test_comment_notice_routes_to_post_author() {
        let mut p = post("P1", "author");
        p.content = "hello".into();
        let notice = comment_notice(&p, &comment("c1", "P1", "u2"));
        assert_eq!(notice.text, "commented on your post");
        assert_eq!(notice.recipients, vec!["author"]);
        assert_eq!(notice.url, "/post/P1");
        assert_eq!(notice.content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_reply_notice_routes_to_tagged_user() {
        let p = post("P1", "author");
        let mut r = reply("c2", "P1", "c1", "u3");
        r.tag = Some(user("u2", "bob"));
        let notice = comment_notice(&p, &r);
        assert_eq!(notice.text, "replied to your comment");
        assert_eq!(notice.recipients, vec!["u2"]);
        assert_eq!(notice.content, None);
    }

    #[tokio::test]
    async fn test_create_notify_attaches_sender_and_broadcasts() {
        let f = fixture(FeedConfig::default());
        f.backend.respond(
            "notify",
            Ok(json!({ "notify": {
                "_id": "n1", "id": "c1", "text": "commented on your post",
                "recipients": ["author"], "url": "/post/P1", "user": "me"
            }})),
        );
        let p = post("P1", "author");
        let created = f.engine.notify_comment(&p, &comment("c1", "P1", "me")).await.unwrap();

        assert_eq!(created.user.as_ref().map(|u| u.user_name.as_str()), Some("me"));
        assert_eq!(f.channel.names(), vec!["createNotify"]);
        assert!(f.ledger.lock().entries().is_empty(), "own notifications are not inserted locally");
    }

    #[tokio::test]
    async fn test_create_notify_failure_is_swallowed() {
        let f = fixture(FeedConfig::default());
        f.backend.respond("notify", Err(FeedError::Disconnected("down".into())));
        let msg = comment_notice(&post("P1", "a"), &comment("c1", "P1", "me"));
        assert!(f.engine.create_notify(msg).await.is_none());
        assert!(f.channel.names().is_empty());
    }

    #[tokio::test]
    async fn test_delete_notify_uses_key_and_url_query() {
        let f = fixture(FeedConfig::default());
        let msg = comment_notice(&post("P1", "a"), &comment("c1", "P1", "me"));
        assert!(f.engine.delete_notify(msg).await);

        let request = &f.backend.requests()[0];
        assert_eq!(request.verb, Verb::Delete);
        assert_eq!(request.path, "notify/c1");
        assert_eq!(request.query_value("url"), Some("/post/P1"));
        assert_eq!(f.channel.names(), vec!["deleteNotify"]);
    }

    #[tokio::test]
    async fn test_mark_read_is_local_even_when_persist_fails() {
        let f = fixture(FeedConfig::default());
        f.ledger
            .lock()
            .apply(LedgerMutation::Insert(notification("n1", "c1", "/post/P1")));
        f.backend.respond("isReadNotify/n1", Err(FeedError::rejected("nope")));

        assert!(!f.engine.mark_read("n1").await);
        let ledger = f.ledger.lock();
        assert!(ledger.get("n1").unwrap().is_read);
        assert_eq!(ledger.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_clears_only_on_success() {
        let f = fixture(FeedConfig::default());
        f.ledger
            .lock()
            .apply(LedgerMutation::Insert(notification("n1", "c1", "/post/P1")));

        f.backend.respond("deleteAllNotify", Err(FeedError::rejected("nope")));
        assert!(!f.engine.delete_all_notifies().await);
        assert_eq!(f.ledger.lock().entries().len(), 1);

        f.backend.respond("deleteAllNotify", Ok(json!({})));
        assert!(f.engine.delete_all_notifies().await);
        assert!(f.ledger.lock().entries().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_notifies_replaces_ledger() {
        let f = fixture(FeedConfig::default());
        f.backend.respond(
            "notifies",
            Ok(json!({ "notifies": [
                { "_id": "n1", "id": "c1", "text": "t", "url": "/post/P1", "isRead": true,
                  "user": { "userName": "bob" } },
                { "_id": "n2", "id": "c2", "text": "t", "url": "/post/P1", "user": "u9" }
            ]})),
        );
        assert_eq!(f.engine.fetch_notifies().await.unwrap(), 2);

        let ledger = f.ledger.lock();
        assert_eq!(ledger.unread_count(), 1);
        assert_eq!(ledger.get("n1").unwrap().user.as_ref().unwrap().user_name, "bob");
        assert!(ledger.get("n2").unwrap().user.is_none());
    }
}
