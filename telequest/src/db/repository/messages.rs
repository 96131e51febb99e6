use libsql::{params, Connection, Row};

use crate::error::Result;
use crate::models::{Author, Message};

use super::chats::parse_timestamp;

const MESSAGE_COLUMNS: &str = "message_id, chat_id, from_user_id, from_user_name, from_user_is_bot, \
                               date, text, reply_to_message_id, chat_title";

pub struct MessageRepository;

impl MessageRepository {
    /// Insert `message` under `chat_id`. Returns `false` when the id was already taken.
    pub async fn insert_if_absent(conn: &Connection, chat_id: i64, message: &Message) -> Result<bool> {
        let affected = conn
            .execute(
                "INSERT INTO messages (message_id, chat_id, from_user_id, from_user_name, from_user_is_bot,
                                       date, text, reply_to_message_id, chat_title, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(chat_id, message_id) DO NOTHING",
                params![
                    message.id,
                    chat_id,
                    message.from_user.id,
                    message.from_user.name.clone(),
                    message.from_user.is_bot as i64,
                    message.date.to_rfc3339(),
                    message.text.clone(),
                    message.reply_to_message,
                    message.chat_title.clone(),
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .await?;

        Ok(affected > 0)
    }

    pub async fn get_by_ids(conn: &Connection, chat_id: i64, ids: &[i64]) -> Result<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // ?1 is the chat id; message ids start at ?2
        let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ?1 AND message_id IN ({placeholders})"
        );

        let mut values = Vec::with_capacity(ids.len() + 1);
        values.push(libsql::Value::from(chat_id));
        values.extend(ids.iter().map(|id| libsql::Value::from(*id)));

        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_message(&row)?);
        }
        Ok(results)
    }

    pub async fn count_by_chat(conn: &Connection, chat_id: i64) -> Result<u64> {
        let mut rows = conn
            .query("SELECT COUNT(*) FROM messages WHERE chat_id = ?1", params![chat_id])
            .await?;

        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    fn row_to_message(row: &Row) -> Result<Message> {
        let date: String = row.get(5)?;
        let is_bot: i64 = row.get(4)?;

        Ok(Message {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            from_user: Author {
                id: row.get(2)?,
                name: row.get::<Option<String>>(3)?,
                is_bot: is_bot != 0,
            },
            date: parse_timestamp(&date)?,
            text: row.get::<Option<String>>(6)?,
            reply_to_message: row.get::<Option<i64>>(7)?,
            chat_title: row.get::<Option<String>>(8)?,
        })
    }
}
