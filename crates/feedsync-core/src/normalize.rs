//! Conversion of nested server payloads into the denormalized shape the
//! store holds, plus the two identity-keyed primitives every mutation
//! funnels through.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FeedError, FeedResult};
use crate::models::{Comment, FeedPage, Identified, Post, UserRef};

// ===== Identity primitives =====

/// Replace every element whose identity matches `next`.
///
/// Pure and O(n): the input slice is never touched. When nothing matches the
/// input itself is handed back, so callers can detect the no-op with
/// `matches!(out, Cow::Borrowed(_))`.
pub fn update_data<'a, T>(items: &'a [T], next: &T) -> Cow<'a, [T]>
where
    T: Identified + Clone,
{
    if !items.iter().any(|item| item.id() == next.id()) {
        return Cow::Borrowed(items);
    }
    Cow::Owned(
        items
            .iter()
            .map(|item| {
                if item.id() == next.id() {
                    next.clone()
                } else {
                    item.clone()
                }
            })
            .collect(),
    )
}

/// Drop the element with identity `id`, keeping the relative order of the rest.
pub fn delete_data<'a, T>(items: &'a [T], id: &str) -> Cow<'a, [T]>
where
    T: Identified + Clone,
{
    if !items.iter().any(|item| item.id() == id) {
        return Cow::Borrowed(items);
    }
    Cow::Owned(items.iter().filter(|item| item.id() != id).cloned().collect())
}

// ===== Server payloads =====

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerAvatar {
    Url(String),
    Image { url: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<ServerAvatar>,
}

/// Users arrive populated or as a bare identity depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerUserRef {
    Populated(ServerUser),
    Id(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerComment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    pub user: ServerUserRef,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub likes: Vec<ServerUserRef>,
    #[serde(default)]
    pub tag: Option<ServerUserRef>,
    #[serde(default)]
    pub post_user_id: Option<String>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPost {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: ServerUserRef,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub comments: Vec<ServerComment>,
    #[serde(default)]
    pub likes: Vec<ServerUserRef>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerFeedPage {
    #[serde(default)]
    pub posts: Vec<ServerPost>,
    #[serde(default)]
    pub result: Option<i64>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl From<ServerUserRef> for UserRef {
    fn from(user: ServerUserRef) -> Self {
        match user {
            ServerUserRef::Id(id) => UserRef::id_only(id),
            ServerUserRef::Populated(user) => UserRef {
                id: user.id,
                user_name: user.user_name,
                full_name: user.full_name,
                avatar: user.avatar.map(|a| match a {
                    ServerAvatar::Url(url) => url,
                    ServerAvatar::Image { url } => url,
                }),
            },
        }
    }
}

// ===== Denormalization =====

/// Turn a server post into the shape the store keeps.
///
/// Duplicate likers and duplicate comments collapse to their first
/// occurrence, and a reply to a reply is re-parented onto the top-level
/// comment so threads stay two levels deep.
pub fn denormalize(server: ServerPost) -> Post {
    let post_id = server.id;

    let mut seen = HashSet::new();
    let raw: Vec<ServerComment> = server
        .comments
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect();

    let parents: HashMap<String, Option<String>> = raw
        .iter()
        .map(|c| (c.id.clone(), c.reply.clone()))
        .collect();

    let comments = raw
        .into_iter()
        .map(|c| {
            let mut comment = denormalize_comment(c, &post_id);
            comment.reply = comment.reply.map(|r| thread_root(&parents, r));
            comment
        })
        .collect();

    Post {
        id: post_id,
        user: server.user.into(),
        content: server.content,
        comments,
        likes: unique_users(server.likes),
        created_at: server.created_at,
    }
}

/// Convert one server comment; `post_id` fills in a missing parent post.
pub fn denormalize_comment(comment: ServerComment, post_id: &str) -> Comment {
    Comment {
        post_id: comment.post_id.unwrap_or_else(|| post_id.to_string()),
        id: comment.id,
        reply: comment.reply,
        user: comment.user.into(),
        content: comment.content,
        likes: unique_users(comment.likes),
        tag: comment.tag.map(UserRef::from),
        post_user_id: comment.post_user_id,
        created_at: comment.created_at,
    }
}

pub fn denormalize_page(page: ServerFeedPage) -> FeedPage {
    let posts: Vec<Post> = page.posts.into_iter().map(denormalize).collect();
    let result = page.result.unwrap_or(posts.len() as i64);
    FeedPage { posts, result }
}

/// Walk `reply` links up to the top-level comment. Unknown parents end the walk.
fn thread_root(parents: &HashMap<String, Option<String>>, mut reply: String) -> String {
    let mut hops = 0;
    while let Some(Some(parent)) = parents.get(&reply) {
        if hops > parents.len() {
            break;
        }
        reply = parent.clone();
        hops += 1;
    }
    reply
}

fn unique_users(users: Vec<ServerUserRef>) -> Vec<UserRef> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .map(UserRef::from)
        .filter(|u| seen.insert(u.id.clone()))
        .collect()
}

// ===== Response decoding =====

/// Deserialize `body[field]`, mapping shape errors to `InvalidResponse`.
pub fn decode_field<T: DeserializeOwned>(body: &Value, field: &str) -> FeedResult<T> {
    let value = body
        .get(field)
        .ok_or_else(|| FeedError::InvalidResponse(format!("missing field `{}`", field)))?;
    T::deserialize(value)
        .map_err(|e| FeedError::InvalidResponse(format!("field `{}`: {}", field, e)))
}

pub fn decode_page(body: Value) -> FeedResult<FeedPage> {
    let page: ServerFeedPage = serde_json::from_value(body)
        .map_err(|e| FeedError::InvalidResponse(format!("feed page: {}", e)))?;
    Ok(denormalize_page(page))
}

pub fn decode_post(body: &Value, field: &str) -> FeedResult<Post> {
    decode_field::<ServerPost>(body, field).map(denormalize)
}
