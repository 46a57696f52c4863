//! In-memory stores for unit and handler tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    repo::{CredentialStore, InsertUserError, SetMembership},
    repo_types::{normalize_email, MembershipStatus, NewUser, User},
};
use crate::messages::{
    repo::MessageStore,
    repo_types::{Message, MessageWithAuthor},
};
use crate::session::{PrincipalToken, SessionId, SessionStore};

/// Email uniqueness is checked and the row inserted under one lock, which
/// stands in for the database's unique constraint.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryCredentialStore {
    /// Test-only deletion; the service itself never deletes users.
    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().remove(&id);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, InsertUserError> {
        let email = normalize_email(&user.email);
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(InsertUserError::DuplicateEmail);
        }
        let row = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email,
            password_hash: user.password_hash,
            membership_status: MembershipStatus::Regular,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn set_membership(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> anyhow::Result<SetMembership> {
        let mut users = self.users.lock().unwrap();
        Ok(match users.get_mut(&id) {
            Some(u) => {
                u.membership_status = status;
                SetMembership::Updated
            }
            None => SetMembership::NotFound,
        })
    }
}

/// Every call fails, as if the database were unreachable.
pub struct FailingCredentialStore;

#[async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn find_by_id(&self, _id: Uuid) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn insert(&self, _user: NewUser) -> Result<User, InsertUserError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn set_membership(
        &self,
        _id: Uuid,
        _status: MembershipStatus,
    ) -> anyhow::Result<SetMembership> {
        anyhow::bail!("connection refused")
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, (PrincipalToken, OffsetDateTime)>>,
}

impl MemorySessionStore {
    /// Rows currently held, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        principal: &PrincipalToken,
        ttl: time::Duration,
    ) -> anyhow::Result<SessionId> {
        let sid = SessionId::generate();
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("session expiry out of range"))?;
        self.sessions
            .lock()
            .unwrap()
            .insert(sid.clone(), (principal.clone(), expires_at));
        Ok(sid)
    }

    async fn load(&self, sid: &SessionId) -> anyhow::Result<Option<PrincipalToken>> {
        let now = OffsetDateTime::now_utc();
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(sid)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(principal, _)| principal.clone()))
    }

    async fn destroy(&self, sid: &SessionId) -> anyhow::Result<()> {
        self.sessions.lock().unwrap().remove(sid);
        Ok(())
    }

    async fn prune_expired(&self) -> anyhow::Result<u64> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

/// Resolves author names through `users` when given one.
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<Message>>,
    users: Option<Arc<dyn CredentialStore>>,
}

impl MemoryMessageStore {
    pub fn with_users(users: Arc<dyn CredentialStore>) -> Self {
        Self {
            messages: Mutex::default(),
            users: Some(users),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, user_id: Uuid, title: &str, body: &str) -> anyhow::Result<Message> {
        let msg = Message {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.messages.lock().unwrap().push(msg.clone());
        Ok(msg)
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<MessageWithAuthor>> {
        let recent: Vec<Message> = {
            let messages = self.messages.lock().unwrap();
            messages
                .iter()
                .rev()
                .take(limit.max(0) as usize)
                .cloned()
                .collect()
        };

        let mut out = Vec::with_capacity(recent.len());
        for m in recent {
            let author = match &self.users {
                Some(users) => users.find_by_id(m.user_id).await?,
                None => None,
            };
            let (first, last) = author
                .map(|u| (u.first_name, u.last_name))
                .unwrap_or_default();
            out.push(MessageWithAuthor {
                id: m.id,
                title: m.title,
                body: m.body,
                created_at: m.created_at,
                author_first_name: first,
                author_last_name: last,
            });
        }
        Ok(out)
    }
}
