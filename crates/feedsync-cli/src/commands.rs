use anyhow::{anyhow, Context, Result};
use feedsync_core::engine::MutationOutcome;
use feedsync_core::models::Post;
use feedsync_core::{FeedSession, MutationIntent};
use serde_json::{json, Value};
use tracing::info;

/// One CLI action against a signed-in session.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedCommand {
    Feed,
    More { user_id: String },
    Like { post_id: String },
    Unlike { post_id: String },
    Comment { post_id: String, content: String },
    DeletePost { post_id: String },
    Notifications,
    Read { notification_id: String },
    ClearNotifications,
}

pub async fn execute(session: &FeedSession, command: FeedCommand) -> Result<Value> {
    let engine = session.engine();
    match command {
        FeedCommand::Feed => {
            let page = engine.fetch_posts().await?;
            Ok(json!({ "result": page.result, "posts": summarize(&page.posts) }))
        }
        FeedCommand::More { user_id } => {
            let page_size = engine.config().page_size;
            let posts = engine.load_more(&user_id, page_size).await?;
            Ok(json!({ "posts": summarize(&posts) }))
        }
        FeedCommand::Like { post_id } => {
            let post = find_post(session, &post_id).await?;
            let outcome = engine.apply(MutationIntent::like(engine.profile(), &post)).await?;
            Ok(outcome_json(&outcome))
        }
        FeedCommand::Unlike { post_id } => {
            let post = find_post(session, &post_id).await?;
            let outcome = engine.apply(MutationIntent::unlike(engine.profile(), &post)).await?;
            Ok(outcome_json(&outcome))
        }
        FeedCommand::Comment { post_id, content } => {
            let post = find_post(session, &post_id).await?;
            let outcome = engine
                .apply(MutationIntent::comment(engine.profile(), &post, content))
                .await?;
            if let MutationOutcome::CommentCreated { post, comment } = &outcome {
                if post.user.id != engine.profile().id {
                    engine.notify_comment(post, comment).await;
                }
            }
            Ok(outcome_json(&outcome))
        }
        FeedCommand::DeletePost { post_id } => {
            let post = find_post(session, &post_id).await?;
            let outcome = engine.apply(MutationIntent::delete_post(engine.profile(), &post)).await?;
            Ok(outcome_json(&outcome))
        }
        FeedCommand::Notifications => {
            engine.fetch_notifies().await?;
            let entries = serde_json::to_value(session.notifications())
                .context("Failed to encode notifications")?;
            Ok(json!({
                "unread": session.unread_badge().to_string(),
                "notifications": entries,
            }))
        }
        FeedCommand::Read { notification_id } => {
            engine.fetch_notifies().await?;
            if !session.ledger().lock().contains(&notification_id) {
                return Err(anyhow!("Notification {} not found", notification_id));
            }
            let persisted = engine.mark_read(&notification_id).await;
            Ok(json!({ "id": notification_id, "persisted": persisted }))
        }
        FeedCommand::ClearNotifications => {
            let cleared = engine.delete_all_notifies().await;
            Ok(json!({ "cleared": cleared }))
        }
    }
}

/// Load the feed and pick one post out of it.
async fn find_post(session: &FeedSession, post_id: &str) -> Result<Post> {
    session.engine().fetch_posts().await?;
    session
        .post(post_id)
        .ok_or_else(|| anyhow!("Post {} is not in the feed", post_id))
}

fn summarize(posts: &[Post]) -> Vec<Value> {
    posts
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "author": p.user.user_name,
                "content": p.content,
                "likes": p.likes.len(),
                "comments": p.comments.len(),
            })
        })
        .collect()
}

fn outcome_json(outcome: &MutationOutcome) -> Value {
    match outcome {
        MutationOutcome::Post(post) => json!({ "post": summarize(std::slice::from_ref(post)) }),
        MutationOutcome::CommentCreated { post, comment } => {
            info!(post = %post.id, comment = %comment.id, "comment posted");
            json!({ "postId": post.id, "commentId": comment.id })
        }
        MutationOutcome::CommentRemoved { post, report } => {
            let failed: Vec<Value> = report
                .failed
                .iter()
                .map(|(id, e)| json!({ "id": id, "error": e.to_string() }))
                .collect();
            json!({ "postId": post.id, "removed": report.removed, "failed": failed })
        }
        MutationOutcome::PostDeleted { post_id } => json!({ "deleted": post_id }),
        MutationOutcome::Acknowledged => json!({ "ok": true }),
    }
}
