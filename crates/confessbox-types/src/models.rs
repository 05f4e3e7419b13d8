use std::fmt;

use chrono::{DateTime, Utc};

/// Telegram user id of whoever sent an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub i64);

/// Telegram chat id. Channels are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Id of a message inside a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// Public sequential number of a confession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfessionId(pub i64);

impl fmt::Display for ConfessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Confession {
    pub id: ConfessionId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Kept for moderation follow-up only; never rendered.
    pub author_id: ActorId,
    /// Set once the channel post went out.
    pub channel_message_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub confession_id: ConfessionId,
    pub text: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// One slice of a confession's comments, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPage {
    /// Page actually served after clamping.
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub items: Vec<Comment>,
}

impl CommentPage {
    /// Page the "Prev" button leads to.
    pub fn prev(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next(&self) -> Option<u32> {
        (self.page < self.total_pages).then(|| self.page + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total_pages: u32) -> CommentPage {
        CommentPage { page, total_pages, total: 0, items: vec![] }
    }

    #[test]
    fn navigation_affordances() {
        assert_eq!((page(1, 1).prev(), page(1, 1).next()), (None, None));
        assert_eq!((page(1, 3).prev(), page(1, 3).next()), (None, Some(2)));
        assert_eq!((page(2, 3).prev(), page(2, 3).next()), (Some(1), Some(3)));
        assert_eq!((page(3, 3).prev(), page(3, 3).next()), (Some(2), None));
    }
}
