use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{notify, FeedEngine, MutationOutcome, PendingMutation};
use crate::backend::ApiRequest;
use crate::channel::FeedEvent;
use crate::constants::paths;
use crate::error::FeedError;
use crate::models::{Comment, Post, UserRef};
use crate::normalize::{decode_field, denormalize_comment, ServerComment};
use crate::store::FeedMutation;
use crate::transitions;

/// Per-member result of a cascade deletion. Members fail independently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CascadeReport {
    pub removed: Vec<String>,
    pub failed: Vec<(String, FeedError)>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl FeedEngine {
    /// Append a provisional comment now; swap in the server's copy once the
    /// backend has assigned its identity.
    ///
    /// Under `RollbackPolicy::Keep` a rejected create leaves the provisional
    /// comment in the store with its `local-` id until the next full fetch.
    /// That id is unknown to the backend, so deleting it will be rejected.
    pub(super) fn create_comment(
        &self,
        post: Post,
        actor: UserRef,
        content: String,
        reply: Option<String>,
        tag: Option<UserRef>,
    ) -> PendingMutation {
        // Replies always hang off a top-level comment
        let reply = reply.map(|id| match post.comment(&id).and_then(|c| c.reply.clone()) {
            Some(root) => root,
            None => id,
        });

        let provisional = Comment {
            id: format!("local-{}", Uuid::new_v4()),
            post_id: post.id.clone(),
            reply: reply.clone(),
            user: actor.clone(),
            content: content.clone(),
            likes: Vec::new(),
            tag: tag.clone(),
            post_user_id: Some(post.user.id.clone()),
            created_at: Utc::now(),
        };
        let optimistic = transitions::with_comment(&post, provisional);
        self.write(FeedMutation::Replace(optimistic));

        let request = ApiRequest::create(
            paths::COMMENT,
            json!({
                "postId": post.id,
                "postUserId": post.user.id,
                "content": content,
                "reply": reply,
                "tag": tag,
            }),
            self.token(),
        );

        let engine = self.clone();
        async move {
            let created = engine
                .backend
                .send(request)
                .await
                .and_then(|body| decode_field::<ServerComment>(&body, "newComment"));

            match created {
                Ok(server) => {
                    let mut comment = denormalize_comment(server, &post.id);
                    comment.user = actor;
                    debug!(post = %post.id, comment = %comment.id, "comment confirmed");

                    let confirmed = transitions::with_comment(&post, comment.clone());
                    engine.bridge.emit(&FeedEvent::CreateComment(confirmed.clone()));
                    engine.write(FeedMutation::Replace(confirmed.clone()));
                    Ok(MutationOutcome::CommentCreated {
                        post: confirmed,
                        comment,
                    })
                }
                Err(e) => Err(engine.reject(e, Some(FeedMutation::Replace(post)))),
            }
        }
        .boxed()
    }

    /// Remove `comment` and its direct replies.
    ///
    /// One delete call per member, issued as a concurrent batch. The intent
    /// only fails when the target's own deletion fails; failed replies are
    /// listed in the report.
    pub(super) fn remove_comment(&self, post: Post, comment: Comment) -> PendingMutation {
        let ids = transitions::cascade_ids(&post, &comment.id);
        let next = transitions::without_comments(&post, &ids);
        self.write(FeedMutation::Replace(next.clone()));

        let engine = self.clone();
        async move {
            let calls = ids.iter().map(|id| {
                let request =
                    ApiRequest::delete(format!("{}/{}", paths::COMMENT, id), engine.token());
                let backend = engine.backend.clone();
                async move { (id.clone(), backend.send(request).await) }
            });

            let mut report = CascadeReport::default();
            for (id, result) in join_all(calls).await {
                match result {
                    Ok(_) => {
                        let mut notice = notify::comment_notice(&post, &comment);
                        notice.id = id.clone();
                        engine.bridge.emit(&FeedEvent::DeleteNotify(notice));
                        report.removed.push(id);
                    }
                    Err(e) => {
                        warn!(comment = %id, error = %e, "cascade member not deleted");
                        report.failed.push((id, e));
                    }
                }
            }

            if let Some((_, err)) = report.failed.iter().find(|(id, _)| *id == comment.id) {
                // Only what really went away stays gone on restore
                let undo = transitions::without_comments(&post, &report.removed);
                return Err(engine.reject(err.clone(), Some(FeedMutation::Replace(undo))));
            }

            engine.bridge.emit(&FeedEvent::DeleteComment(next.clone()));
            engine.write(FeedMutation::Replace(next.clone()));
            Ok(MutationOutcome::CommentRemoved { post: next, report })
        }
        .boxed()
    }
}
