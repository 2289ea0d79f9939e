//! Pure post-level state transitions.
//!
//! Each function takes the current value of a post and returns its next
//! value. The engine writes the result into the store; nothing here touches
//! shared state.

use std::collections::HashSet;

use crate::models::{Comment, Post, UserRef};

/// Append `actor` to the liker set. Liking twice is a caller bug and is not
/// de-duplicated here.
pub fn with_like(post: &Post, actor: &UserRef) -> Post {
    let mut next = post.clone();
    next.likes.push(actor.clone());
    next
}

pub fn without_like(post: &Post, actor_id: &str) -> Post {
    let mut next = post.clone();
    next.likes.retain(|u| u.id != actor_id);
    next
}

pub fn with_comment(post: &Post, comment: Comment) -> Post {
    let mut next = post.clone();
    next.comments.push(comment);
    next
}

pub fn with_comment_content(post: &Post, comment_id: &str, content: &str) -> Post {
    map_comment(post, comment_id, |c| c.content = content.to_string())
}

pub fn with_comment_like(post: &Post, comment_id: &str, actor: &UserRef) -> Post {
    map_comment(post, comment_id, |c| c.likes.push(actor.clone()))
}

pub fn without_comment_like(post: &Post, comment_id: &str, actor_id: &str) -> Post {
    map_comment(post, comment_id, |c| c.likes.retain(|u| u.id != actor_id))
}

fn map_comment(post: &Post, comment_id: &str, f: impl FnOnce(&mut Comment)) -> Post {
    let mut next = post.clone();
    if let Some(comment) = next.comments.iter_mut().find(|c| c.id == comment_id) {
        f(comment);
    }
    next
}

// ===== Cascade =====

/// Identities removed together with `target_id`: its direct replies in
/// thread order, then the target itself. One level only.
pub fn cascade_ids(post: &Post, target_id: &str) -> Vec<String> {
    let mut ids: Vec<String> = post.replies_to(target_id).map(|c| c.id.clone()).collect();
    ids.push(target_id.to_string());
    ids
}

/// Filter out every comment in `ids` in a single pass.
pub fn remove_cascade(comments: &[Comment], ids: &[String]) -> Vec<Comment> {
    let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
    comments
        .iter()
        .filter(|c| !doomed.contains(c.id.as_str()))
        .cloned()
        .collect()
}

pub fn without_comments(post: &Post, ids: &[String]) -> Post {
    let mut next = post.clone();
    next.comments = remove_cascade(&post.comments, ids);
    next
}
