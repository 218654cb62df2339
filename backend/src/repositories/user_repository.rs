//! User persistence.
//!
//! The [`UserRepository`] trait can be mocked with mockall in unit tests; the
//! Postgres implementation maps unique-constraint violations to typed errors.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::connection::DbPool;
use crate::models::user::{NewUser, User, CONSTRAINT_USER_EMAIL, CONSTRAINT_USER_NAME};

#[derive(Debug, Error)]
pub enum UserRepositoryError {
    #[error("user name already exists")]
    UserNameTaken,
    #[error("email already exists")]
    EmailTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    async fn create_user(&self, user: &NewUser) -> Result<User, UserRepositoryError>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, user_name, email, password, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        let query = format!(
            "INSERT INTO users (user_name, email, password) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.user_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&*self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(user)
    }
}

fn map_unique_violation(err: sqlx::Error) -> UserRepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(CONSTRAINT_USER_NAME) => return UserRepositoryError::UserNameTaken,
                Some(CONSTRAINT_USER_EMAIL) => return UserRepositoryError::EmailTaken,
                _ => {}
            }
        }
    }
    UserRepositoryError::Database(err)
}
