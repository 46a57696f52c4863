use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{MembershipStatus, User};

// No `Debug` on types that carry plaintext passwords.

/// Request body for user registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the membership upgrade.
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    pub secret_code: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub membership_status: MembershipStatus,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            membership_status: u.membership_status,
        }
    }
}
