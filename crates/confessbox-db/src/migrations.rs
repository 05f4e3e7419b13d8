use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (confessions + comments)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS confessions (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                text                TEXT NOT NULL,
                created_at          INTEGER NOT NULL,
                channel_message_id  INTEGER,
                author_id           INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS comments (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                confession_id   INTEGER NOT NULL REFERENCES confessions(id),
                text            TEXT NOT NULL,
                avatar          TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_comments_confession
                ON comments(confession_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
