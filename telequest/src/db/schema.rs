use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per group chat
        CREATE TABLE IF NOT EXISTS chats (
            chat_id INTEGER PRIMARY KEY,
            group_name TEXT,
            categories TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );

        -- Messages are keyed by the provider id, which is only unique per chat
        CREATE TABLE IF NOT EXISTS messages (
            chat_id INTEGER NOT NULL,
            message_id INTEGER NOT NULL,
            from_user_id INTEGER NOT NULL,
            from_user_name TEXT,
            from_user_is_bot INTEGER NOT NULL DEFAULT 0,
            date TEXT NOT NULL,
            text TEXT,
            reply_to_message_id INTEGER,
            chat_title TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (chat_id, message_id),
            FOREIGN KEY (chat_id) REFERENCES chats(chat_id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_date ON messages(chat_id, date);

        -- Metadata key-value store
        CREATE TABLE IF NOT EXISTS telequest_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    Ok(())
}

/// Vector table for the local similarity index. The dimension is fixed at creation.
pub async fn init_vector_schema(conn: &Connection, dimensions: usize) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS message_vectors (
            id TEXT PRIMARY KEY,
            chat_id INTEGER NOT NULL,
            message_id INTEGER NOT NULL,
            embedding F32_BLOB({dimensions}) NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_message_vectors_chat_id ON message_vectors(chat_id);
        "#
    ))
    .await?;

    Ok(())
}
