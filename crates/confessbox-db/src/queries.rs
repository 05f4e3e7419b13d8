use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::warn;

use confessbox_types::models::{ActorId, Comment, CommentPage, Confession, ConfessionId, MessageId};
use confessbox_types::pagination::PageWindow;

use crate::Database;
use crate::models::{CommentRow, ConfessionRow, NewComment};

impl Database {
    // -- Confessions --

    /// Insert a confession and return its sequence id. The channel post link
    /// starts out unset.
    pub fn create_confession(
        &self,
        text: &str,
        author_id: ActorId,
        now: DateTime<Utc>,
    ) -> Result<ConfessionId> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO confessions (text, created_at, author_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![text, now.timestamp(), author_id.0],
            )?;
            Ok(ConfessionId(conn.last_insert_rowid()))
        })
    }

    /// Link a confession to its channel post. Calling it again overwrites.
    pub fn attach_channel_message(&self, id: ConfessionId, message_id: MessageId) -> Result<()> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE confessions SET channel_message_id = ?1 WHERE id = ?2",
                rusqlite::params![message_id.0, id.0],
            )?;
            if updated == 0 {
                return Err(anyhow!("Confession not found: {}", id));
            }
            Ok(())
        })
    }

    pub fn get_confession(&self, id: ConfessionId) -> Result<Option<Confession>> {
        self.with_conn(|conn| {
            Ok(query_confession(conn, id.0)?.map(ConfessionRow::into_model))
        })
    }

    // -- Comments --

    /// Insert a comment and read back the new count atomically.
    /// Returns `None` when the confession does not exist; nothing is written.
    pub fn add_comment(
        &self,
        confession_id: ConfessionId,
        text: &str,
        avatar: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<NewComment>> {
        self.with_conn_mut(|conn| {
            if query_confession(conn, confession_id.0)?.is_none() {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO comments (confession_id, text, avatar, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![confession_id.0, text, avatar, now.timestamp()],
            )?;
            let id = conn.last_insert_rowid();
            let count = query_comment_count(conn, confession_id.0)?;

            Ok(Some(NewComment { id, count }))
        })
    }

    pub fn count_comments(&self, confession_id: ConfessionId) -> Result<u64> {
        self.with_conn(|conn| query_comment_count(conn, confession_id.0))
    }

    /// Newest-first page of comments. `page` is clamped into the valid range,
    /// so an empty page only comes back when there are no comments at all.
    pub fn list_comments_page(
        &self,
        confession_id: ConfessionId,
        page: u32,
        page_size: u32,
    ) -> Result<CommentPage> {
        self.with_conn(|conn| {
            let total = query_comment_count(conn, confession_id.0)?;
            let window = PageWindow::compute(total, page_size, page);

            let mut stmt = conn.prepare(
                "SELECT id, confession_id, text, avatar, created_at
                 FROM comments
                 WHERE confession_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let items = stmt
                .query_map(
                    rusqlite::params![confession_id.0, window.limit as i64, window.offset as i64],
                    |row| {
                        Ok(CommentRow {
                            id: row.get(0)?,
                            confession_id: row.get(1)?,
                            text: row.get(2)?,
                            avatar: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )?
                .map(|row| row.map(CommentRow::into_model))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(CommentPage {
                page: window.page,
                total_pages: window.total_pages,
                total,
                items,
            })
        })
    }
}

fn query_confession(conn: &Connection, id: i64) -> Result<Option<ConfessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, created_at, channel_message_id, author_id FROM confessions WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(ConfessionRow {
                id: row.get(0)?,
                text: row.get(1)?,
                created_at: row.get(2)?,
                channel_message_id: row.get(3)?,
                author_id: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_comment_count(conn: &Connection, confession_id: i64) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE confession_id = ?1",
        [confession_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

fn timestamp_to_utc(secs: i64, what: &str, id: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(|| {
        warn!("Corrupt created_at {} on {} {}", secs, what, id);
        DateTime::default()
    })
}

impl ConfessionRow {
    fn into_model(self) -> Confession {
        Confession {
            id: ConfessionId(self.id),
            created_at: timestamp_to_utc(self.created_at, "confession", self.id),
            text: self.text,
            author_id: ActorId(self.author_id),
            channel_message_id: self.channel_message_id.map(MessageId),
        }
    }
}

impl CommentRow {
    fn into_model(self) -> Comment {
        Comment {
            id: self.id,
            confession_id: ConfessionId(self.confession_id),
            created_at: timestamp_to_utc(self.created_at, "comment", self.id),
            text: self.text,
            avatar: self.avatar,
        }
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_comments(db: &Database, id: ConfessionId, n: usize) -> Vec<i64> {
        let now = Utc::now();
        (0..n)
            .map(|i| {
                db.add_comment(id, &format!("comment {i}"), "🦊", now + Duration::seconds(i as i64))
                    .unwrap()
                    .unwrap()
                    .id
            })
            .collect()
    }

    #[test]
    fn confession_ids_are_sequential() {
        let db = db();
        let now = Utc::now();
        let a = db.create_confession("first", ActorId(1), now).unwrap();
        let b = db.create_confession("second", ActorId(2), now).unwrap();
        assert_eq!(a, ConfessionId(1));
        assert_eq!(b, ConfessionId(2));
    }

    #[test]
    fn new_confession_is_unlinked_until_attached() {
        let db = db();
        let id = db.create_confession("hello there", ActorId(9), Utc::now()).unwrap();

        let c = db.get_confession(id).unwrap().unwrap();
        assert_eq!(c.text, "hello there");
        assert_eq!(c.author_id, ActorId(9));
        assert_eq!(c.channel_message_id, None);

        db.attach_channel_message(id, MessageId(500)).unwrap();
        db.attach_channel_message(id, MessageId(501)).unwrap();
        let c = db.get_confession(id).unwrap().unwrap();
        assert_eq!(c.channel_message_id, Some(MessageId(501)));
    }

    #[test]
    fn attach_to_missing_confession_fails() {
        assert!(db().attach_channel_message(ConfessionId(3), MessageId(1)).is_err());
    }

    #[test]
    fn missing_confession_is_none() {
        assert!(db().get_confession(ConfessionId(77)).unwrap().is_none());
    }

    #[test]
    fn comment_on_missing_confession_writes_nothing() {
        let db = db();
        let res = db.add_comment(ConfessionId(1), "orphan", "👻", Utc::now()).unwrap();
        assert!(res.is_none());
        assert_eq!(db.count_comments(ConfessionId(1)).unwrap(), 0);
    }

    #[test]
    fn add_comment_reports_running_count() {
        let db = db();
        let id = db.create_confession("c", ActorId(1), Utc::now()).unwrap();
        let other = db.create_confession("d", ActorId(1), Utc::now()).unwrap();

        for expected in 1..=3 {
            let added = db.add_comment(id, "hi", "🐼", Utc::now()).unwrap().unwrap();
            assert_eq!(added.count, expected);
            assert_eq!(db.count_comments(id).unwrap(), expected);
        }
        assert_eq!(db.count_comments(other).unwrap(), 0);
    }

    #[test]
    fn pages_are_newest_first_and_clamped() {
        let db = db();
        db.create_confession("one", ActorId(1), Utc::now()).unwrap();
        let id = db.create_confession("two", ActorId(1), Utc::now()).unwrap();
        let ids = seed_comments(&db, id, 5);

        let first = db.list_comments_page(id, 1, 4).unwrap();
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.total, 5);
        let got: Vec<i64> = first.items.iter().map(|c| c.id).collect();
        assert_eq!(got, vec![ids[4], ids[3], ids[2], ids[1]]);

        let second = db.list_comments_page(id, 2, 4).unwrap();
        let got: Vec<i64> = second.items.iter().map(|c| c.id).collect();
        assert_eq!(got, vec![ids[0]]);

        let beyond = db.list_comments_page(id, 5, 4).unwrap();
        assert_eq!(beyond, second);

        let zero = db.list_comments_page(id, 0, 4).unwrap();
        assert_eq!(zero, first);
    }

    #[test]
    fn empty_listing_has_single_page() {
        let db = db();
        let id = db.create_confession("quiet", ActorId(1), Utc::now()).unwrap();
        let page = db.list_comments_page(id, 3, 4).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn listing_is_repeatable() {
        let db = db();
        let id = db.create_confession("x", ActorId(1), Utc::now()).unwrap();
        seed_comments(&db, id, 6);
        let a = db.list_comments_page(id, 2, 4).unwrap();
        let b = db.list_comments_page(id, 2, 4).unwrap();
        assert_eq!(a, b);
    }
}
