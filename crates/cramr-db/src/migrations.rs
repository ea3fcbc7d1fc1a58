use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Database: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                user_id     TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                email       TEXT NOT NULL DEFAULT '',
                session_id  TEXT,
                image_url   TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE user_photos (
                image_name  TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(user_id),
                image_file  TEXT NOT NULL
            );

            CREATE TABLE courses (
                title       TEXT PRIMARY KEY
            );

            -- One row per (user, course); position keeps the order courses were added in
            CREATE TABLE enrolled_courses (
                user_id     TEXT NOT NULL,
                course      TEXT NOT NULL,
                position    INTEGER NOT NULL,
                PRIMARY KEY (user_id, course)
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                course      TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                location    TEXT NOT NULL DEFAULT '',
                latitude    REAL NOT NULL,
                longitude   REAL NOT NULL,
                start_time  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_course ON sessions(course);

            CREATE TABLE session_members (
                session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                joined_seq  INTEGER NOT NULL,
                PRIMARY KEY (session_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
