use async_trait::async_trait;
use libsql::params;

use crate::db::schema::init_vector_schema;
use crate::db::{Database, MetadataRepository};
use crate::error::{Result, TelequestError};
use crate::models::{EmbeddingVector, QueryMatch, QueryResponse, VectorMetadata};

use super::traits::VectorIndex;

/// Vector index stored next to the messages in libSQL, searched by cosine distance.
pub struct LibSqlVectorIndex {
    db: Database,
    dimensions: usize,
}

impl LibSqlVectorIndex {
    pub async fn new(db: Database, dimensions: usize) -> Result<Self> {
        let conn = db.connect()?;

        match MetadataRepository::get_embedding_dimensions(&conn).await? {
            Some(stored) if stored != dimensions => {
                return Err(TelequestError::Validation(format!(
                    "Vector table holds {stored}-dimensional embeddings but {dimensions} are configured"
                )));
            }
            Some(_) => {}
            None => MetadataRepository::set_embedding_dimensions(&conn, dimensions).await?,
        }

        init_vector_schema(&conn, dimensions).await?;
        Ok(Self { db, dimensions })
    }

    fn check_dimensions(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.dimensions {
            return Err(TelequestError::VectorIndex(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                values.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LibSqlVectorIndex {
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()> {
        for vector in vectors {
            self.check_dimensions(&vector.values)?;
        }

        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;
        let now = chrono::Utc::now().to_rfc3339();

        for vector in vectors {
            let embedding_json = serde_json::to_string(&vector.values)?;
            tx.execute(
                "INSERT INTO message_vectors (id, chat_id, message_id, embedding, created_at)
                 VALUES (?1, ?2, ?3, vector32(?4), ?5)
                 ON CONFLICT(id) DO UPDATE SET embedding = excluded.embedding",
                params![
                    vector.key.clone(),
                    vector.chat_id,
                    vector.message_id,
                    embedding_json,
                    now.clone()
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, chat_id: i64, vector: &[f32], top_k: usize) -> Result<QueryResponse> {
        self.check_dimensions(vector)?;
        let embedding_json = serde_json::to_string(vector)?;
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                "SELECT id, chat_id, message_id,
                        1 - vector_distance_cos(embedding, vector32(?1)) AS score
                 FROM message_vectors
                 WHERE chat_id = ?2
                 ORDER BY score DESC
                 LIMIT ?3",
                params![embedding_json, chat_id, top_k as i64],
            )
            .await?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            matches.push(QueryMatch {
                id: row.get(0)?,
                score: row.get::<f64>(3)? as f32,
                values: None,
                metadata: Some(VectorMetadata {
                    chat_id: row.get(1)?,
                    message_id: Some(row.get(2)?),
                }),
            });
        }

        Ok(QueryResponse {
            matches,
            namespace: String::new(),
        })
    }
}
