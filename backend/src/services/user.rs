use std::sync::Arc;
use thiserror::Error;

use crate::models::user::{NewUser, User};
use crate::repositories::{UserRepository, UserRepositoryError};
use crate::utils::password::{hash_password, verify_password};

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user name already registered")]
    UserNameTaken,
    #[error("email already registered")]
    EmailTaken,
    /// Unknown email and wrong password are deliberately the same error.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<UserRepositoryError> for UserError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::UserNameTaken => UserError::UserNameTaken,
            UserRepositoryError::EmailTaken => UserError::EmailTaken,
            UserRepositoryError::Database(err) => UserError::Internal(err.into()),
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<User, UserError> {
        let password_hash = hash_password(&input.password)?;
        let user = self
            .repo
            .create_user(&NewUser {
                user_name: input.user_name,
                email: input.email,
                password_hash,
            })
            .await?;
        tracing::info!(account_id = %user.id, email = %user.email, "User registered");
        Ok(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<User, UserError> {
        let user = self
            .repo
            .find_by_email(&input.email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(UserError::InvalidCredentials);
        }
        Ok(user)
    }
}
