/// Database row types — these map directly to SQLite rows.
/// Converted into confessbox-types models at the query boundary.

pub struct ConfessionRow {
    pub id: i64,
    pub text: String,
    pub created_at: i64,
    pub channel_message_id: Option<i64>,
    pub author_id: i64,
}

pub struct CommentRow {
    pub id: i64,
    pub confession_id: i64,
    pub text: String,
    pub avatar: String,
    pub created_at: i64,
}

/// Result of inserting a comment: its id and the confession's comment count
/// read in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewComment {
    pub id: i64,
    pub count: u64,
}
