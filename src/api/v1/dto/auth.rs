/*
 * Responsibility
 * - /auth 系の request/response DTO
 * - password / token は Debug に出さない
 */
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::services::auth::{Identity, Role};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username is required");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        Ok(())
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=50;
pub const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err("username is required");
        }
        if !USERNAME_CHARS.contains(&username.chars().count()) {
            return Err("username must be 3-50 chars");
        }
        if !is_plausible_email(self.email.trim()) {
            return Err("email must be a valid address");
        }
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err("password must be at least 6 chars");
        }
        Ok(())
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

// local@domain.tld 程度の形式チェックのみ (到達性は見ない)
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
}

/// `GET /auth/me` and `POST /auth/register` body.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        Self {
            roles: identity.roles.to_vec(),
            id: identity.id,
            username: identity.username,
            email: identity.email,
        }
    }
}
