use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use cramr_types::models::UserContext;

/// On-device pinned identity: exactly one row holding the signed-in user,
/// their current session and picture URL. Survives restarts.
pub struct LocalCache {
    conn: Mutex<Connection>,
}

impl LocalCache {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        init(&conn)?;
        info!("Local cache opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Local cache lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Returns the pinned identity, creating an empty record on first use.
    pub fn load(&self) -> Result<UserContext> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO logged_user (id, user_id, username, session_id, image_url)
                 VALUES (1, '', '', '', '')",
                [],
            )?;
            let ctx = conn.query_row(
                "SELECT user_id, username, session_id, image_url FROM logged_user WHERE id = 1",
                [],
                |row| {
                    Ok(UserContext {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        session_id: row.get(2)?,
                        image_url: row.get(3)?,
                    })
                },
            )?;
            Ok(ctx)
        })
    }

    pub fn pin(&self, ctx: &UserContext) -> Result<()> {
        debug!("Pinning user {} (session '{}')", ctx.user_id, ctx.session_id);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO logged_user (id, user_id, username, session_id, image_url)
                 VALUES (1, ?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    username = excluded.username,
                    session_id = excluded.session_id,
                    image_url = excluded.image_url",
                params![ctx.user_id, ctx.username, ctx.session_id, ctx.image_url],
            )?;
            Ok(())
        })
    }

    pub fn clear_session(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE logged_user SET session_id = '' WHERE id = 1", [])?;
            Ok(())
        })
    }
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS logged_user (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            user_id     TEXT NOT NULL,
            username    TEXT NOT NULL,
            session_id  TEXT NOT NULL,
            image_url   TEXT NOT NULL
        );",
    )?;
    Ok(())
}
