use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};

use crate::auth::{
    repo::{CredentialStore, SetMembership},
    repo_types::{MembershipStatus, User},
};
use crate::error::AppError;
use crate::state::AppState;

/// Anonymous requests stop here, before any store is touched.
pub fn require_authenticated(user: Option<User>) -> Result<User, AppError> {
    user.ok_or(AppError::Unauthenticated)
}

/// Guards the one-way `regular -> member` transition behind a shared passphrase.
#[derive(Clone)]
pub struct MembershipGate {
    users: Arc<dyn CredentialStore>,
    secret: Arc<str>,
}

impl FromRef<AppState> for MembershipGate {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), &state.config.membership_secret)
    }
}

impl MembershipGate {
    pub fn new(users: Arc<dyn CredentialStore>, secret: &str) -> Self {
        Self {
            users,
            secret: Arc::from(secret),
        }
    }

    /// Returns the user as now stored. Upgrading an existing member is a
    /// no-op success.
    pub async fn upgrade_membership(
        &self,
        user: Option<User>,
        submitted_code: &str,
    ) -> Result<User, AppError> {
        let user = require_authenticated(user)?;

        if submitted_code != &*self.secret {
            warn!(user_id = %user.id, "membership upgrade rejected: wrong code");
            return Err(AppError::WrongCode);
        }

        match self
            .users
            .set_membership(user.id, MembershipStatus::Member)
            .await?
        {
            SetMembership::Updated => {
                info!(user_id = %user.id, "membership upgraded");
                Ok(User {
                    membership_status: MembershipStatus::Member,
                    ..user
                })
            }
            // The session outlived its user.
            SetMembership::NotFound => Err(AppError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::NewUser;
    use crate::testing::MemoryCredentialStore;

    async fn seeded() -> (Arc<MemoryCredentialStore>, User) {
        let users = Arc::new(MemoryCredentialStore::default());
        let user = users
            .insert(NewUser {
                first_name: "Barbara".into(),
                last_name: "Liskov".into(),
                email: "barbara@example.com".into(),
                password_hash: "$argon2id$placeholder".into(),
            })
            .await
            .unwrap();
        (users, user)
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        assert!(matches!(
            require_authenticated(None),
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn correct_code_upgrades() {
        let (users, user) = seeded().await;
        let gate = MembershipGate::new(users.clone(), "cubular");

        let upgraded = gate.upgrade_membership(Some(user.clone()), "cubular").await.unwrap();
        assert!(upgraded.is_member());

        let stored = users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.membership_status, MembershipStatus::Member);
    }

    #[tokio::test]
    async fn wrong_code_leaves_status_unchanged() {
        let (users, user) = seeded().await;
        let gate = MembershipGate::new(users.clone(), "cubular");

        let err = gate
            .upgrade_membership(Some(user.clone()), "Cubular")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongCode));

        let stored = users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.membership_status, MembershipStatus::Regular);
    }

    #[tokio::test]
    async fn anonymous_upgrade_is_rejected_before_code_check() {
        let (users, _) = seeded().await;
        let gate = MembershipGate::new(users, "cubular");
        let err = gate.upgrade_membership(None, "cubular").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn upgrade_is_idempotent() {
        let (users, user) = seeded().await;
        let gate = MembershipGate::new(users.clone(), "cubular");
        let once = gate.upgrade_membership(Some(user), "cubular").await.unwrap();
        let twice = gate.upgrade_membership(Some(once), "cubular").await.unwrap();
        assert!(twice.is_member());
    }

    #[tokio::test]
    async fn vanished_user_is_unauthenticated() {
        let (users, user) = seeded().await;
        users.remove(user.id);
        let gate = MembershipGate::new(users, "cubular");
        let err = gate.upgrade_membership(Some(user), "cubular").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
