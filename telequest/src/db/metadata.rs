use chrono::Utc;
use libsql::Connection;

use crate::error::Result;

const EMBEDDING_DIMENSIONS_KEY: &str = "embedding_dimensions";

pub struct MetadataRepository;

impl MetadataRepository {
    pub async fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let mut rows = conn
            .query("SELECT value FROM telequest_meta WHERE key = ?1", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    pub async fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO telequest_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value, now.as_str()],
        )
        .await?;
        Ok(())
    }

    pub async fn get_embedding_dimensions(conn: &Connection) -> Result<Option<usize>> {
        Ok(Self::get(conn, EMBEDDING_DIMENSIONS_KEY)
            .await?
            .and_then(|value| value.parse().ok()))
    }

    pub async fn set_embedding_dimensions(conn: &Connection, dims: usize) -> Result<()> {
        Self::set(conn, EMBEDDING_DIMENSIONS_KEY, &dims.to_string()).await
    }
}
