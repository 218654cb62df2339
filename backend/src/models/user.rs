use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::types::AccountId;

/// Unique constraint on `users.user_name`.
pub const CONSTRAINT_USER_NAME: &str = "uni_user_user_name";
/// Unique constraint on `users.email`.
pub const CONSTRAINT_USER_EMAIL: &str = "uni_user_user_email";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: AccountId,
    pub user_name: String,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub user_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 32))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_validation() {
        let ok = RegisterRequest {
            user_name: "alice".into(),
            email: "alice@example.com".into(),
            password: "correct-horse".into(),
        };
        assert!(ok.validate().is_ok());

        let short_name = RegisterRequest {
            user_name: "al".into(),
            ..ok.clone()
        };
        assert!(short_name.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".into(),
            ..ok
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn login_request_requires_password() {
        let req = LoginRequest {
            email: "alice@example.com".into(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
