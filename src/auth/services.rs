use std::sync::Arc;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::auth::{
    dto::RegisterRequest,
    password::PasswordHasher,
    repo::{CredentialStore, InsertUserError},
    repo_types::{normalize_email, NewUser, User},
};
use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Form-level checks for sign-up. Runs before any hashing or storage work.
pub(crate) fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::Validation("First and last name are required".into()));
    }
    if !is_valid_email(&normalize_email(&req.email)) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation("Password too short".into()));
    }
    if req.password != req.confirm_password {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

/// Hashes the password and inserts the user. A concurrent sign-up with the
/// same email loses at the unique constraint and gets `DuplicateEmail`.
pub async fn register_user(
    users: &dyn CredentialStore,
    hasher: &PasswordHasher,
    req: RegisterRequest,
) -> Result<User, AppError> {
    validate_registration(&req)?;

    let password_hash = hasher.hash_blocking(req.password).await?;
    let new_user = NewUser {
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        email: normalize_email(&req.email),
        password_hash,
    };

    match users.insert(new_user).await {
        Ok(user) => Ok(user),
        Err(InsertUserError::DuplicateEmail) => Err(AppError::DuplicateEmail),
        Err(InsertUserError::Other(e)) => Err(AppError::System(e)),
    }
}

/// Email/password strategy.
pub struct Authenticator {
    users: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    // Verified against when the email is unknown so both failure paths do
    // the same amount of hashing work.
    decoy_hash: String,
}

impl Authenticator {
    pub fn new(users: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> anyhow::Result<Self> {
        let decoy_hash = hasher
            .hash("clubhouse-decoy-password")
            .context("compute decoy hash")?;
        Ok(Self {
            users,
            hasher,
            decoy_hash,
        })
    }

    /// Resolves credentials to a user.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    /// Storage failures and unusable stored hashes are `System` errors and
    /// are never reported as bad credentials.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let found = self
            .users
            .find_by_email(email)
            .await
            .context("look up user by email")?;

        let Some(user) = found else {
            let _ = self
                .hasher
                .verify_blocking(password.to_owned(), self.decoy_hash.clone())
                .await;
            warn!("login rejected: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let ok = self
            .hasher
            .verify_blocking(password.to_owned(), user.password_hash.clone())
            .await
            .with_context(|| format!("verify password for user {}", user.id))?;

        if !ok {
            warn!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        debug!(user_id = %user.id, "credentials verified");
        Ok(user)
    }
}
