use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Message, MessageWithAuthor};

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, title: &str, body: &str) -> anyhow::Result<Message>;
    /// Newest first.
    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<MessageWithAuthor>>;
}

#[derive(Clone)]
pub struct PgMessageStore {
    db: PgPool,
}

impl PgMessageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, user_id: Uuid, title: &str, body: &str) -> anyhow::Result<Message> {
        let msg = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (user_id, title, body)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, body, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.db)
        .await
        .context("insert message")?;
        Ok(msg)
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<MessageWithAuthor>> {
        let rows = sqlx::query_as::<_, MessageWithAuthor>(
            r#"
            SELECT m.id, m.title, m.body, m.created_at,
                   u.first_name AS author_first_name,
                   u.last_name AS author_last_name
              FROM messages m
              JOIN users u ON u.id = m.user_id
             ORDER BY m.created_at DESC
             LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list recent messages")?;
        Ok(rows)
    }
}
