use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

const BUSY_TIMEOUT_MS: u64 = 5000;

/// Shared handle to the libSQL database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    db: Arc<libsql::Database>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            let auth_token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), auth_token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), auth_token).build().await?,
            }
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self { db: Arc::new(db) };
        database.configure().await;

        let conn = database.connect()?;
        schema::init_schema(&conn).await?;

        tracing::debug!(url = %config.url, "Database ready");
        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    async fn configure(&self) {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to open connection for pragmas");
                return;
            }
        };

        let pragmas = [
            format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"),
            "PRAGMA journal_mode = WAL".to_string(),
            "PRAGMA foreign_keys = ON".to_string(),
        ];
        for pragma in pragmas {
            if let Err(error) = conn.execute_batch(&pragma).await {
                tracing::warn!(pragma = %pragma, error = %error, "Failed to apply SQLite pragma");
            }
        }
    }

    pub async fn ping(&self) -> Result<()> {
        let conn = self.connect()?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }
}
