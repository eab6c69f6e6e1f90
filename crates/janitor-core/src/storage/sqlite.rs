use rusqlite::{Connection, Result};
use std::time::Duration;
use tracing::debug;

/// Value of `PRAGMA user_version` written by `schema.sql`.
pub const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        // journal_mode returns a row, so it can't go through execute_batch
        self.conn
            .query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16000;",
        )?;
        // The analysis worker writes on its own connection.
        self.conn.busy_timeout(Duration::from_secs(5))?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys on)");
        Ok(())
    }

    fn migrate_schema(&self) -> Result<()> {
        let version = self.schema_version()?;
        if version >= SCHEMA_VERSION {
            debug!("SQLite schema at version {}", version);
            return Ok(());
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema migrated (version {} -> {})", version, SCHEMA_VERSION);
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM file_analysis;
             DELETE FROM files;
             DELETE FROM profiles;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}
