use std::{fmt, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, warn};

use super::codec::PrincipalToken;

const SESSION_ID_LEN: usize = 43; // ~256 bits of alphanumerics

/// Opaque session key carried in the cookie.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let id: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// Session ids are bearer secrets: keep them out of logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(..)")
    }
}

/// Durable session records with expiry enforced by the store itself.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, principal: &PrincipalToken, ttl: time::Duration)
        -> anyhow::Result<SessionId>;
    /// `None` for unknown or expired sessions.
    async fn load(&self, sid: &SessionId) -> anyhow::Result<Option<PrincipalToken>>;
    /// Removing an absent session is not an error.
    async fn destroy(&self, sid: &SessionId) -> anyhow::Result<()>;
    /// Deletes expired rows, returning how many went.
    async fn prune_expired(&self) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(
        &self,
        principal: &PrincipalToken,
        ttl: time::Duration,
    ) -> anyhow::Result<SessionId> {
        let sid = SessionId::generate();
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(ttl)
            .context("session expiry out of range")?;
        sqlx::query(
            r#"
            INSERT INTO sessions (sid, principal, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(sid.as_str())
        .bind(principal.as_str())
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("insert session")?;
        Ok(sid)
    }

    async fn load(&self, sid: &SessionId) -> anyhow::Result<Option<PrincipalToken>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT principal
              FROM sessions
             WHERE sid = $1 AND expires_at > now()
            "#,
        )
        .bind(sid.as_str())
        .fetch_optional(&self.db)
        .await
        .context("select session")?;
        Ok(row.map(|(principal,)| PrincipalToken::from(principal)))
    }

    async fn destroy(&self, sid: &SessionId) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE sid = $1"#)
            .bind(sid.as_str())
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn prune_expired(&self) -> anyhow::Result<u64> {
        let done = sqlx::query(r#"DELETE FROM sessions WHERE expires_at <= now()"#)
            .execute(&self.db)
            .await
            .context("prune expired sessions")?;
        Ok(done.rows_affected())
    }
}

/// Periodically deletes expired sessions. Abort the handle on shutdown.
pub fn spawn_pruner(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.prune_expired().await {
                Ok(0) => {}
                Ok(n) => debug!(pruned = n, "expired sessions pruned"),
                Err(e) => warn!(error = %format!("{e:#}"), "session prune failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySessionStore;

    fn token() -> PrincipalToken {
        PrincipalToken::from(uuid::Uuid::new_v4().to_string())
    }

    #[test]
    fn generated_ids_are_long_and_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_eq!(a.as_str().len(), SESSION_ID_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
        assert_eq!(format!("{a:?}"), "SessionId(..)");
    }

    #[tokio::test]
    async fn create_then_load() {
        let store = MemorySessionStore::default();
        let principal = token();
        let sid = store.create(&principal, time::Duration::days(30)).await.unwrap();
        assert_eq!(store.load(&sid).await.unwrap(), Some(principal));
    }

    #[tokio::test]
    async fn expired_session_is_not_loaded() {
        let store = MemorySessionStore::default();
        let sid = store.create(&token(), time::Duration::seconds(-1)).await.unwrap();
        assert_eq!(store.load(&sid).await.unwrap(), None);
        assert_eq!(store.prune_expired().await.unwrap(), 1);
        assert_eq!(store.prune_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn oversized_ttl_is_an_error() {
        let store = MemorySessionStore::default();
        assert!(store
            .create(&token(), time::Duration::days(10_000_000))
            .await
            .is_err());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = MemorySessionStore::default();
        let sid = store.create(&token(), time::Duration::days(1)).await.unwrap();
        store.destroy(&sid).await.unwrap();
        assert_eq!(store.load(&sid).await.unwrap(), None);
        store.destroy(&sid).await.unwrap();
        store
            .destroy(&SessionId::from("never-existed".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pruner_runs_on_interval() {
        let store = Arc::new(MemorySessionStore::default());
        store.create(&token(), time::Duration::seconds(-5)).await.unwrap();
        store.create(&token(), time::Duration::days(1)).await.unwrap();

        let handle = spawn_pruner(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(store.len(), 1);
    }
}
