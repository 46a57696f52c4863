use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Membership level. Only ever moves from `Regular` to `Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Regular,
    Member,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,                // normalized, see `normalize_email`
    #[serde(skip_serializing)]
    pub password_hash: String,        // PHC string, never exposed in JSON
    pub membership_status: MembershipStatus,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_member(&self) -> bool {
        self.membership_status == MembershipStatus::Member
    }
}

/// Fields required to create a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Lower-cased, trimmed email. Applied on insert and on every lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
