use async_trait::async_trait;
use bb8_redis::redis::RedisError;
use thiserror::Error;

use super::SessionTtls;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("redis connection pool error: {0}")]
    Pool(#[from] bb8::RunError<RedisError>),
    #[error("redis command failed: {0}")]
    Redis(#[from] RedisError),
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

/// Everything written when a session is created. Backends must apply it as a
/// single atomic unit.
#[derive(Debug, Clone)]
pub struct SessionWrite {
    pub access_token_key: String,
    pub refresh_token_key: String,
    pub session_key: String,
    pub account_sessions_key: String,
    pub session_id: String,
    /// Serialized `AccountInfo`, stored under both token keys.
    pub account_info: String,
    /// Serialized `TokenPair`, stored in the session container.
    pub token_pair: String,
    pub ttls: SessionTtls,
}

/// Key-value engine holding session state.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Applies all writes of a new session atomically: either every key is
    /// written or none is.
    async fn write_session(&self, write: &SessionWrite) -> Result<(), BackendError>;

    /// Reads a string key. Expired keys read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Reads one field of a hash key. Expired keys read as `None`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, BackendError>;

    /// Cardinality of a set key; missing keys count as empty.
    async fn scard(&self, key: &str) -> Result<usize, BackendError>;
}
