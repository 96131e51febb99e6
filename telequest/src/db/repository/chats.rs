use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{Result, TelequestError};
use crate::models::ChatRecord;

pub struct ChatRepository;

impl ChatRepository {
    /// Create the chat row unless it already exists. Existing names are left untouched.
    pub async fn ensure(conn: &Connection, chat_id: i64, group_name: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO chats (chat_id, group_name, categories, created_at)
             VALUES (?1, ?2, '[]', ?3)
             ON CONFLICT(chat_id) DO NOTHING",
            params![chat_id, group_name.map(str::to_string), now],
        )
        .await?;
        Ok(())
    }

    pub async fn get(conn: &Connection, chat_id: i64) -> Result<Option<ChatRecord>> {
        let mut rows = conn
            .query(
                "SELECT c.chat_id, c.group_name, c.categories, c.created_at,
                        (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.chat_id)
                 FROM chats c WHERE c.chat_id = ?1",
                params![chat_id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let categories: String = row.get(2)?;
        let created_at: String = row.get(3)?;
        let message_count: i64 = row.get(4)?;

        Ok(Some(ChatRecord {
            chat_id: row.get(0)?,
            group_name: row.get::<Option<String>>(1)?,
            categories: serde_json::from_str(&categories)?,
            message_count: message_count.max(0) as u64,
            created_at: parse_timestamp(&created_at)?,
        }))
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TelequestError::Internal(format!("Invalid stored timestamp {raw:?}: {e}")))
}
