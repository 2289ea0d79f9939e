pub mod comment;
pub mod notification;
pub mod post;
pub mod user;

pub use comment::Comment;
pub use notification::{Notification, NotificationSender, NotifyMessage};
pub use post::{FeedPage, Post};
pub use user::UserRef;

/// Entities matched by identity equality in store collections.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Comment {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Notification {
    fn id(&self) -> &str {
        &self.id
    }
}
