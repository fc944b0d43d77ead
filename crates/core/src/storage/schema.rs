//! Credential schema setup.
//!
//! The schema version lives in SQLite's `user_version` pragma. A fresh
//! database is brought up in one transaction; a database written by a newer
//! build is refused rather than guessed at.

use tokio_rusqlite::Connection;

use crate::Error;

/// Version stamped into `user_version` once the schema is in place.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = include_str!("../../sql/credentials.sql");

/// Create the credential schema if this database predates it.
pub async fn apply(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            return Err(Error::MigrationFailed(format!(
                "database schema v{version} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        if version < SCHEMA_VERSION {
            tracing::debug!(from = version, to = SCHEMA_VERSION, "creating credential schema");
            conn.execute_batch(&format!("BEGIN;\n{SCHEMA}\nPRAGMA user_version = {SCHEMA_VERSION};\nCOMMIT;"))?;
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user_version(conn: &Connection) -> i64 {
        conn.call(|conn| conn.pragma_query_value(None, "user_version", |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        apply(&conn).await.unwrap();
        apply(&conn).await.unwrap();

        let has_credentials: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='credentials')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert!(has_credentials);
        assert_eq!(user_version(&conn).await, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1))
            .await
            .unwrap();

        let err = apply(&conn).await.unwrap_err();
        assert!(matches!(err, Error::MigrationFailed(_)));
    }
}
