//! SQLite-backed token storage.
//!
//! Opens the database, applies pragmas, creates the schema, and keeps the
//! bearer token under a fixed key in the `credentials` table.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, params, rusqlite};

use super::{TOKEN_KEY, TokenStorage, schema};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

/// Token storage handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct SqliteTokenStorage {
    pub(crate) conn: Connection,
}

impl SqliteTokenStorage {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and creates the
    /// credential schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        schema::apply(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl TokenStorage for SqliteTokenStorage {
    async fn load(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT value FROM credentials WHERE key = ?1",
                    params![TOKEN_KEY],
                    |row| row.get::<_, String>(0),
                );
                match result {
                    Ok(v) if v.is_empty() => Ok(None),
                    Ok(v) => Ok(Some(v)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn save(&self, token: &str) -> Result<(), Error> {
        if token.is_empty() {
            return Err(Error::InvalidInput("token must not be empty".to_string()));
        }
        let token = token.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![TOKEN_KEY, token, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute("DELETE FROM credentials WHERE key = ?1", params![TOKEN_KEY])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = SqliteTokenStorage::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_token_absent_by_default() {
        let db = SqliteTokenStorage::open_in_memory().await.unwrap();
        assert_eq!(db.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_load_overwrite_remove() {
        let db = SqliteTokenStorage::open_in_memory().await.unwrap();

        db.save("first").await.unwrap();
        assert_eq!(db.load().await.unwrap().as_deref(), Some("first"));

        db.save("second").await.unwrap();
        assert_eq!(db.load().await.unwrap().as_deref(), Some("second"));

        db.remove().await.unwrap();
        assert_eq!(db.load().await.unwrap(), None);

        // Removing twice is fine.
        db.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_empty_rejected() {
        let db = SqliteTokenStorage::open_in_memory().await.unwrap();
        assert!(matches!(db.save("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_token_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("shiftdesk-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reopen.sqlite");
        let _ = std::fs::remove_file(&path);

        {
            let db = SqliteTokenStorage::open(&path).await.unwrap();
            db.save("persisted").await.unwrap();
        }

        let db = SqliteTokenStorage::open(&path).await.unwrap();
        assert_eq!(db.load().await.unwrap().as_deref(), Some("persisted"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
