//! Optimistic mutation engine.
//!
//! Every intent is applied to the feed store synchronously inside
//! [`FeedEngine::apply`]; the returned future carries only the network half
//! and the reconciliation that follows it.

mod comments;
mod notify;

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::backend::{ApiRequest, Backend};
use crate::channel::{EventBridge, FeedEvent};
use crate::config::{FeedConfig, RollbackPolicy};
use crate::constants::paths;
use crate::error::{FeedError, FeedResult};
use crate::models::{Comment, FeedPage, Post, UserRef};
use crate::normalize::{decode_page, decode_post};
use crate::store::{FeedMutation, SharedFeedStore, SharedLedger};
use crate::transitions;

pub use comments::CascadeReport;
pub use notify::comment_notice;

/// Signed-in user the engine acts for.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub profile: UserRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntentKind {
    Like,
    Unlike,
    CreateComment {
        content: String,
        reply: Option<String>,
        tag: Option<UserRef>,
    },
    UpdateComment {
        comment: Comment,
        content: String,
    },
    RemoveComment {
        comment: Comment,
    },
    LikeComment {
        comment: Comment,
    },
    UnlikeComment {
        comment: Comment,
    },
    DeletePost,
    SavePost,
    UnsavePost,
}

/// Transient value describing one optimistic round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationIntent {
    pub kind: IntentKind,
    pub actor: UserRef,
    /// Post as the caller saw it when issuing the intent
    pub target_post: Post,
}

impl MutationIntent {
    pub fn new(kind: IntentKind, actor: &UserRef, target_post: &Post) -> Self {
        Self {
            kind,
            actor: actor.clone(),
            target_post: target_post.clone(),
        }
    }

    pub fn like(actor: &UserRef, post: &Post) -> Self {
        Self::new(IntentKind::Like, actor, post)
    }

    pub fn unlike(actor: &UserRef, post: &Post) -> Self {
        Self::new(IntentKind::Unlike, actor, post)
    }

    pub fn comment(actor: &UserRef, post: &Post, content: impl Into<String>) -> Self {
        Self::new(
            IntentKind::CreateComment {
                content: content.into(),
                reply: None,
                tag: None,
            },
            actor,
            post,
        )
    }

    /// Reply to `parent`, tagging its author.
    pub fn reply(
        actor: &UserRef,
        post: &Post,
        parent: &Comment,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            IntentKind::CreateComment {
                content: content.into(),
                reply: Some(parent.id.clone()),
                tag: Some(parent.user.clone()),
            },
            actor,
            post,
        )
    }

    pub fn remove_comment(actor: &UserRef, post: &Post, comment: &Comment) -> Self {
        Self::new(
            IntentKind::RemoveComment {
                comment: comment.clone(),
            },
            actor,
            post,
        )
    }

    pub fn delete_post(actor: &UserRef, post: &Post) -> Self {
        Self::new(IntentKind::DeletePost, actor, post)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Post(Post),
    CommentCreated { post: Post, comment: Comment },
    CommentRemoved { post: Post, report: CascadeReport },
    PostDeleted { post_id: String },
    Acknowledged,
}

pub type PendingMutation = BoxFuture<'static, FeedResult<MutationOutcome>>;

#[derive(Clone)]
pub struct FeedEngine {
    store: SharedFeedStore,
    ledger: SharedLedger,
    backend: Arc<dyn Backend>,
    bridge: EventBridge,
    auth: Arc<AuthContext>,
    config: Arc<FeedConfig>,
}

impl FeedEngine {
    pub fn new(
        store: SharedFeedStore,
        ledger: SharedLedger,
        backend: Arc<dyn Backend>,
        bridge: EventBridge,
        auth: AuthContext,
        config: FeedConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            backend,
            bridge,
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }

    pub fn profile(&self) -> &UserRef {
        &self.auth.profile
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Apply `intent` to the store now and return the network half.
    ///
    /// The store already shows the optimistic value when this returns, before
    /// the future is first polled. Nothing cancels an issued intent.
    pub fn apply(&self, intent: MutationIntent) -> PendingMutation {
        let MutationIntent {
            kind,
            actor,
            target_post: post,
        } = intent;
        debug!(post = %post.id, ?kind, "applying intent");

        match kind {
            IntentKind::Like => {
                let next = transitions::with_like(&post, &actor);
                let path = format!("{}/{}/like", paths::POSTS, post.id);
                let request = ApiRequest::update(path, self.token());
                let event = Some(FeedEvent::LikePost(next.clone()));
                self.replace_optimistically(post, next, request, event)
            }
            IntentKind::Unlike => {
                let next = transitions::without_like(&post, &actor.id);
                let path = format!("{}/{}/unlike", paths::POSTS, post.id);
                let request = ApiRequest::update(path, self.token());
                let event = Some(FeedEvent::UnlikePost(next.clone()));
                self.replace_optimistically(post, next, request, event)
            }
            IntentKind::CreateComment {
                content,
                reply,
                tag,
            } => self.create_comment(post, actor, content, reply, tag),
            IntentKind::UpdateComment { comment, content } => {
                let next = transitions::with_comment_content(&post, &comment.id, &content);
                let path = format!("{}/{}", paths::COMMENT, comment.id);
                let request =
                    ApiRequest::update(path, self.token()).with_body(json!({ "content": content }));
                // No event name exists for edits; other sessions see them on refetch
                self.replace_optimistically(post, next, request, None)
            }
            IntentKind::RemoveComment { comment } => self.remove_comment(post, comment),
            IntentKind::LikeComment { comment } => {
                let next = transitions::with_comment_like(&post, &comment.id, &actor);
                let path = format!("{}/{}/like", paths::COMMENT, comment.id);
                let request = ApiRequest::update(path, self.token());
                let event = self.comment_like_event(FeedEvent::LikePost(next.clone()));
                self.replace_optimistically(post, next, request, event)
            }
            IntentKind::UnlikeComment { comment } => {
                let next = transitions::without_comment_like(&post, &comment.id, &actor.id);
                let path = format!("{}/{}/unlike", paths::COMMENT, comment.id);
                let request = ApiRequest::update(path, self.token());
                let event = self.comment_like_event(FeedEvent::UnlikePost(next.clone()));
                self.replace_optimistically(post, next, request, event)
            }
            IntentKind::DeletePost => self.delete_post(post),
            IntentKind::SavePost => {
                let path = format!("{}/{}", paths::SAVE_POST, post.id);
                self.acknowledge(ApiRequest::update(path, self.token()))
            }
            IntentKind::UnsavePost => {
                let path = format!("{}/{}", paths::UNSAVE_POST, post.id);
                self.acknowledge(ApiRequest::update(path, self.token()))
            }
        }
    }

    // ===== Feed loading =====

    /// Initial load: replace the feed with the server's first page.
    pub async fn fetch_posts(&self) -> FeedResult<FeedPage> {
        self.write(FeedMutation::Loading);
        let request = ApiRequest::fetch(paths::POSTS, self.token());
        match self.backend.send(request).await.and_then(decode_page) {
            Ok(page) => {
                info!(posts = page.posts.len(), result = page.result, "feed loaded");
                self.write(FeedMutation::Loaded(Some(page.clone())));
                Ok(page)
            }
            Err(e) => {
                warn!(error = %e, "feed load failed");
                self.write(FeedMutation::Loaded(None));
                Err(e)
            }
        }
    }

    /// Re-fetch `target_id`'s posts up to `page * page_size` and replace the
    /// local list with the result. The page only advances on success.
    pub async fn load_more(&self, target_id: &str, page_size: u32) -> FeedResult<Vec<Post>> {
        let page = self.store.lock().page();
        // The limit comes from user config; saturate rather than wrap
        let limit = page.saturating_mul(page_size);
        let path = format!("{}/{}", paths::USER_POSTS, target_id);
        let request = ApiRequest::fetch(path, self.token()).with_query("limit", limit.to_string());

        let loaded = decode_page(self.backend.send(request).await?)?;
        debug!(page, limit, posts = loaded.posts.len(), "loaded more posts");
        let posts = loaded.posts.clone();
        self.write(FeedMutation::PageLoaded(loaded));
        Ok(posts)
    }

    /// Publish a new post and put the server's copy at the top of the feed.
    pub async fn create_post(&self, content: &str) -> FeedResult<Post> {
        let request = ApiRequest::create(paths::POSTS, json!({ "content": content }), self.token());
        let body = self.backend.send(request).await?;
        let mut post = decode_post(&body, "newPost")?;
        post.user = self.auth.profile.clone();
        self.write(FeedMutation::Prepend(post.clone()));
        Ok(post)
    }

    // ===== Internals =====

    fn token(&self) -> &str {
        &self.auth.token
    }

    fn write(&self, mutation: FeedMutation) -> bool {
        self.store.lock().apply(mutation)
    }

    fn comment_like_event(&self, event: FeedEvent) -> Option<FeedEvent> {
        // Comment likes stay local unless configured otherwise; peers only
        // pick them up on their next full fetch.
        self.config.broadcast_comment_likes.then_some(event)
    }

    /// Common shape for post-level replace intents.
    fn replace_optimistically(
        &self,
        previous: Post,
        next: Post,
        request: ApiRequest,
        event: Option<FeedEvent>,
    ) -> PendingMutation {
        self.write(FeedMutation::Replace(next.clone()));
        let engine = self.clone();
        async move {
            match engine.backend.send(request).await {
                Ok(_) => {
                    if let Some(event) = event {
                        engine.bridge.emit(&event);
                    }
                    // Reconcile with the value computed at intent time. A newer
                    // optimistic value for the same post is overwritten here.
                    engine.write(FeedMutation::Replace(next.clone()));
                    Ok(MutationOutcome::Post(next))
                }
                Err(e) => Err(engine.reject(e, Some(FeedMutation::Replace(previous)))),
            }
        }
        .boxed()
    }

    fn delete_post(&self, post: Post) -> PendingMutation {
        let index = self.store.lock().position(&post.id);
        self.write(FeedMutation::Remove {
            post_id: post.id.clone(),
        });
        let request = ApiRequest::delete(format!("{}/{}", paths::POSTS, post.id), self.token());
        let engine = self.clone();
        async move {
            match engine.backend.send(request).await {
                Ok(_) => Ok(MutationOutcome::PostDeleted { post_id: post.id }),
                Err(e) => {
                    let undo = FeedMutation::Restore { index, post };
                    Err(engine.reject(e, Some(undo)))
                }
            }
        }
        .boxed()
    }

    fn acknowledge(&self, request: ApiRequest) -> PendingMutation {
        let engine = self.clone();
        async move {
            engine
                .backend
                .send(request)
                .await
                .map(|_| MutationOutcome::Acknowledged)
                .map_err(|e| engine.reject(e, None))
        }
        .boxed()
    }

    /// Log a failed call and undo the optimistic write if the policy says so.
    fn reject(&self, error: FeedError, undo: Option<FeedMutation>) -> FeedError {
        warn!(error = %error, "mutation rejected by backend");
        if self.config.rollback == RollbackPolicy::Restore {
            if let Some(undo) = undo {
                debug!("restoring pre-mutation state");
                self.write(undo);
            }
        }
        error
    }
}
