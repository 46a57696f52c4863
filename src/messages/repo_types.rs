use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// Message joined with its author's public fields.
#[derive(Debug, Clone, FromRow)]
pub struct MessageWithAuthor {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub author_first_name: String,
    pub author_last_name: String,
}
