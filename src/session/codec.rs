use std::sync::Arc;

use axum::extract::FromRef;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{repo::CredentialStore, repo_types::User};
use crate::state::AppState;

/// What a session stores about its user: the id, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalToken(String);

impl PrincipalToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PrincipalToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Result of turning a token back into a user.
#[derive(Debug)]
pub enum Rehydrated {
    User(User),
    /// The token no longer names a user; treat the request as anonymous.
    Invalidated,
}

/// Maps users to principal tokens and back.
#[derive(Clone)]
pub struct SessionCodec {
    users: Arc<dyn CredentialStore>,
}

impl FromRef<AppState> for SessionCodec {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone())
    }
}

impl SessionCodec {
    pub fn new(users: Arc<dyn CredentialStore>) -> Self {
        Self { users }
    }

    pub fn serialize(&self, user: &User) -> PrincipalToken {
        PrincipalToken(user.id.to_string())
    }

    /// Re-reads the user on every call so membership changes apply on the
    /// next request. Storage failures are errors; a vanished user is not.
    pub async fn deserialize(&self, token: &PrincipalToken) -> anyhow::Result<Rehydrated> {
        let Ok(id) = Uuid::parse_str(token.as_str()) else {
            debug!("unparsable principal token");
            return Ok(Rehydrated::Invalidated);
        };

        Ok(match self.users.find_by_id(id).await? {
            Some(user) => Rehydrated::User(user),
            None => {
                debug!(user_id = %id, "principal refers to missing user");
                Rehydrated::Invalidated
            }
        })
    }
}
