use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{normalize_email, MembershipStatus, NewUser, User};

#[derive(Error, Debug)]
pub enum InsertUserError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMembership {
    Updated,
    NotFound,
}

/// Durable user records.
///
/// Email uniqueness is the store's job: `insert` must fail with
/// `DuplicateEmail` atomically, not after a separate existence check.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn insert(&self, user: NewUser) -> Result<User, InsertUserError>;
    /// Idempotent: setting the current status again is `Updated`.
    async fn set_membership(&self, id: Uuid, status: MembershipStatus)
        -> anyhow::Result<SetMembership>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, membership_status, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await
        .context("select user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, membership_status, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select user by id")?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, InsertUserError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, first_name, last_name, email, password_hash, membership_status, created_at
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(InsertUserError::DuplicateEmail)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn set_membership(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> anyhow::Result<SetMembership> {
        let done = sqlx::query(r#"UPDATE users SET membership_status = $1 WHERE id = $2"#)
            .bind(status)
            .bind(id)
            .execute(&self.db)
            .await
            .context("update membership status")?;

        Ok(if done.rows_affected() == 0 {
            SetMembership::NotFound
        } else {
            SetMembership::Updated
        })
    }
}
