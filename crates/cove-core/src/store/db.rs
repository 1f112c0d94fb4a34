use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::StoreResult;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    cid        TEXT PRIMARY KEY,
    unread     INTEGER NOT NULL DEFAULT 0,
    preview    TEXT,
    last_time  INTEGER,
    mention_sn INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS messages (
    cid      TEXT NOT NULL,
    sender   TEXT NOT NULL,
    sn       INTEGER NOT NULL,
    time     INTEGER NOT NULL,
    type     INTEGER NOT NULL,
    sig      TEXT NOT NULL,
    payload  TEXT NOT NULL,
    PRIMARY KEY (cid, sender, sn)
);
CREATE INDEX IF NOT EXISTS idx_messages_cid_time ON messages (cid, time);
CREATE TABLE IF NOT EXISTS contacts (
    user    TEXT NOT NULL,
    contact TEXT NOT NULL,
    PRIMARY KEY (user, contact)
);
CREATE TABLE IF NOT EXISTS blocked (
    user  TEXT NOT NULL,
    entry TEXT NOT NULL,
    PRIMARY KEY (user, entry)
);
CREATE TABLE IF NOT EXISTS muted (
    user  TEXT NOT NULL,
    entry TEXT NOT NULL,
    PRIMARY KEY (user, entry)
);
CREATE TABLE IF NOT EXISTS members (
    gid    TEXT NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (gid, member)
);
CREATE TABLE IF NOT EXISTS admins (
    gid   TEXT NOT NULL,
    admin TEXT NOT NULL,
    PRIMARY KEY (gid, admin)
);
CREATE TABLE IF NOT EXISTS documents (
    did       TEXT NOT NULL,
    doc_type  TEXT NOT NULL,
    props     TEXT NOT NULL,
    signature TEXT NOT NULL,
    time      INTEGER NOT NULL,
    PRIMARY KEY (did, doc_type)
);
CREATE TABLE IF NOT EXISTS metas (
    mid        TEXT PRIMARY KEY,
    public_key TEXT NOT NULL,
    time       INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS private_keys (
    uid      TEXT NOT NULL,
    key_type TEXT NOT NULL,
    key      TEXT NOT NULL,
    time     INTEGER NOT NULL,
    PRIMARY KEY (uid, key_type)
);
CREATE TABLE IF NOT EXISTS logins (
    uid     TEXT PRIMARY KEY,
    station TEXT,
    time    INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS traces (
    cid    TEXT NOT NULL,
    sender TEXT NOT NULL,
    sn     INTEGER NOT NULL,
    sig    TEXT NOT NULL,
    trace  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_traces_key ON traces (cid, sender, sn);
"#;

/// Shared SQLite handle. One connection, serialized behind a mutex; every
/// store issues short statements and never holds the lock across an await.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(db_dir: P) -> StoreResult<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| {
            crate::error::StoreError::InvalidRecord(format!(
                "cannot create data dir {}: {e}",
                db_dir.display()
            ))
        })?;
        let conn = Connection::open(db_dir.join("cove.db"))?;
        Self::init(conn)
    }

    /// Fresh in-memory database, mainly for tests.
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection locked.
    pub fn with<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StoreResult<T> {
        let conn = self.conn.lock();
        Ok(f(&conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        let n: i64 = db
            .with(|conn| {
                conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_in_memory_is_isolated() {
        let a = Database::in_memory().unwrap();
        let b = Database::in_memory().unwrap();
        a.with(|conn| {
            conn.execute(
                "INSERT INTO conversations (cid) VALUES (?1)",
                ["user:alice"],
            )
        })
        .unwrap();
        let n: i64 = b
            .with(|conn| {
                conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(n, 0);
    }
}
