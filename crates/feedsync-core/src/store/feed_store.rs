use std::borrow::Cow;

use tracing::trace;

use crate::constants::FIRST_LOAD_MORE_PAGE;
use crate::models::{FeedPage, Post};
use crate::normalize::{delete_data, update_data};

/// A single state transition of the feed store. Local intents and remote
/// events both reduce to one of these; `FeedStore::apply` is the only writer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMutation {
    /// Initial fetch started
    Loading,
    /// Initial fetch finished; `None` when it failed
    Loaded(Option<FeedPage>),
    /// "Load more" succeeded: replace everything and advance the page
    PageLoaded(FeedPage),
    Prepend(Post),
    Replace(Post),
    Remove { post_id: String },
    /// Undo a `Remove`: the counter goes back up, and the post is put back
    /// at `index` when it was held locally
    Restore { index: Option<usize>, post: Post },
}

/// Ordered post collection in server order, plus pagination bookkeeping.
#[derive(Debug, Clone)]
pub struct FeedStore {
    posts: Vec<Post>,
    result: i64,
    page: u32,
    loading: bool,
}

impl FeedStore {
    pub fn new() -> Self {
        Self {
            posts: Vec::new(),
            result: 0,
            page: FIRST_LOAD_MORE_PAGE,
            loading: false,
        }
    }

    pub fn with_page(page: FeedPage) -> Self {
        let mut store = Self::new();
        store.apply(FeedMutation::Loaded(Some(page)));
        store
    }

    // ===== Getters =====

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.posts.iter().position(|p| p.id == id)
    }

    /// Server-reported total, independent of how many posts are held locally.
    pub fn result(&self) -> i64 {
        self.result
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    // ===== Mutations =====

    /// Apply one transition. Returns false when it matched nothing and the
    /// store is unchanged.
    pub fn apply(&mut self, mutation: FeedMutation) -> bool {
        trace!(?mutation, "feed store apply");
        match mutation {
            FeedMutation::Loading => {
                self.loading = true;
                true
            }
            FeedMutation::Loaded(page) => {
                if let Some(page) = page {
                    self.posts = page.posts;
                    self.result = page.result;
                }
                self.loading = false;
                true
            }
            FeedMutation::PageLoaded(page) => {
                self.posts = page.posts;
                self.result = page.result;
                self.page += 1;
                true
            }
            FeedMutation::Prepend(post) => {
                self.posts.insert(0, post);
                true
            }
            FeedMutation::Replace(post) => match update_data(&self.posts, &post) {
                Cow::Borrowed(_) => false,
                Cow::Owned(posts) => {
                    self.posts = posts;
                    true
                }
            },
            FeedMutation::Remove { post_id } => {
                // The counter tracks the server total, so it moves even when
                // the post was never held locally. Not clamped either.
                if let Cow::Owned(posts) = delete_data(&self.posts, &post_id) {
                    self.posts = posts;
                }
                self.result -= 1;
                true
            }
            FeedMutation::Restore { index, post } => {
                if let Some(index) = index {
                    if self.post(&post.id).is_none() {
                        let index = index.min(self.posts.len());
                        self.posts.insert(index, post);
                    }
                }
                self.result += 1;
                true
            }
        }
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}
