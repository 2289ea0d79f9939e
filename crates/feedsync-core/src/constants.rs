//! Wire names and fixed values shared across the crate.

/// Default backend base URL used when no config file is present.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// Posts per page for "load more" requests.
pub const DEFAULT_PAGE_SIZE: u32 = 9;

/// Page 1 is the initial load, so the pagination counter starts here.
pub const FIRST_LOAD_MORE_PAGE: u32 = 2;

/// Unread counts above this are displayed as a sentinel instead of a number.
pub const UNREAD_DISPLAY_THRESHOLD: usize = 5;

/// Channel capacity for the in-process event hub.
pub const HUB_CAPACITY: usize = 256;

// Notification texts attached to comment-removal events
pub const REPLY_NOTIFY_TEXT: &str = "replied to your comment";
pub const COMMENT_NOTIFY_TEXT: &str = "commented on your post";

// Event channel names
pub mod events {
    pub const CREATE_NOTIFY: &str = "createNotify";
    pub const DELETE_NOTIFY: &str = "deleteNotify";
    pub const LIKE_POST: &str = "likePost";
    pub const UNLIKE_POST: &str = "unLikePost";
    pub const CREATE_COMMENT: &str = "createComment";
    pub const DELETE_COMMENT: &str = "deleteComment";
}

// Backend paths
pub mod paths {
    pub const POSTS: &str = "posts";
    pub const USER_POSTS: &str = "user_posts";
    pub const COMMENT: &str = "comment";
    pub const SAVE_POST: &str = "save-post";
    pub const UNSAVE_POST: &str = "unsave-post";
    pub const NOTIFY: &str = "notify";
    pub const NOTIFIES: &str = "notifies";
    pub const IS_READ_NOTIFY: &str = "isReadNotify";
    pub const DELETE_ALL_NOTIFY: &str = "deleteAllNotify";
}
