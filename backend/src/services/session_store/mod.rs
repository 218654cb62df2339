//! Session and token storage.
//!
//! A session is four keyed facts that are always written together:
//!
//! | key                               | value         | expiry              |
//! |-----------------------------------|---------------|---------------------|
//! | `identity:at:<access_token>`      | `AccountInfo` | access TTL          |
//! | `identity:rt:<refresh_token>`     | `AccountInfo` | refresh TTL         |
//! | `identity:sid:<session_id>`       | hash, `token_pair` field | refresh TTL + grace |
//! | `identity:user:sids:<account_id>` | set of session ids | none           |
//!
//! Creation goes through a single atomic backend operation. Lookups are
//! single-key reads. Expiry is left entirely to the backend.
//!
//! The per-account session set is never pruned: ids of expired sessions stay
//! in it until something outside this module removes them.

pub mod backend;
pub mod keys;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod redis;
pub mod token;

use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::session::{AccountInfo, TokenPair};
use crate::types::AccountId;

pub use backend::{BackendError, SessionBackend, SessionWrite};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InjectedFailure, MemorySessionBackend};
pub use redis::RedisSessionBackend;
pub use token::{OsRandom, RandomSource, SessionTokens};

/// Lifetimes applied to the keys of a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtls {
    pub access_token: Duration,
    pub refresh_token: Duration,
    pub session_grace: Duration,
}

impl SessionTtls {
    /// The session container outlives its refresh token by the grace window.
    pub fn session_container(&self) -> Duration {
        self.refresh_token.saturating_add(self.session_grace)
    }
}

impl Default for SessionTtls {
    fn default() -> Self {
        Self {
            access_token: Duration::from_secs(30 * 60),
            refresh_token: Duration::from_secs(7 * 24 * 60 * 60),
            session_grace: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to generate random session token")]
    RandomGeneration(#[source] rand::Error),
    #[error("failed to encode session value")]
    Encoding(#[source] serde_json::Error),
    #[error("failed to create session")]
    SessionCreation(#[source] BackendError),
    #[error("token or session not found")]
    NotFound,
    #[error("stored session value is corrupt")]
    Corruption(#[source] serde_json::Error),
    #[error("session lookup failed")]
    Lookup(#[source] BackendError),
    #[error("session store operation timed out after {0:?}")]
    Timeout(Duration),
}

pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    random: Arc<dyn RandomSource>,
    ttls: SessionTtls,
    command_timeout: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, ttls: SessionTtls, command_timeout: Duration) -> Self {
        Self {
            backend,
            random: Arc::new(OsRandom),
            ttls,
            command_timeout,
        }
    }

    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn ttls(&self) -> SessionTtls {
        self.ttls
    }

    /// Mints a new session for `account_id` and persists all of its keys in
    /// one atomic backend operation.
    ///
    /// Nothing is written when token generation fails. A failed write leaves
    /// no partial state and is not retried; calling again mints a new session.
    #[tracing::instrument(level = "debug", name = "session_create", skip(self))]
    pub async fn create_session(&self, account_id: AccountId) -> Result<TokenPair, SessionStoreError> {
        let tokens =
            SessionTokens::generate(self.random.as_ref()).map_err(SessionStoreError::RandomGeneration)?;

        let account_info = AccountInfo {
            account_id,
            session_id: tokens.session_id.clone(),
        };
        let token_pair = TokenPair {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        };

        let write = SessionWrite {
            access_token_key: keys::access_token_key(&token_pair.access_token),
            refresh_token_key: keys::refresh_token_key(&token_pair.refresh_token),
            session_key: keys::session_key(&tokens.session_id),
            account_sessions_key: keys::account_sessions_key(account_id),
            account_info: serde_json::to_string(&account_info).map_err(SessionStoreError::Encoding)?,
            token_pair: serde_json::to_string(&token_pair).map_err(SessionStoreError::Encoding)?,
            session_id: tokens.session_id,
            ttls: self.ttls,
        };

        self.bounded(self.backend.write_session(&write))
            .await?
            .map_err(|err| {
                tracing::warn!(%account_id, error = %err, "Session creation failed");
                SessionStoreError::SessionCreation(err)
            })?;

        tracing::debug!(%account_id, session_id = %write.session_id, "Session created");
        Ok(token_pair)
    }

    /// Resolves an access token to the account and session it was issued for.
    #[tracing::instrument(
        level = "debug",
        name = "session_find_access_token",
        skip_all,
        fields(token = %redact(access_token))
    )]
    pub async fn find_access_token(&self, access_token: &str) -> Result<AccountInfo, SessionStoreError> {
        let key = keys::access_token_key(access_token);
        let raw = self
            .bounded(self.backend.get(&key))
            .await?
            .map_err(SessionStoreError::Lookup)?
            .ok_or(SessionStoreError::NotFound)?;
        decode(&key, &raw)
    }

    /// Returns the token pair currently recorded for a session.
    #[tracing::instrument(level = "debug", name = "session_find", skip(self))]
    pub async fn find_session(&self, session_id: &str) -> Result<TokenPair, SessionStoreError> {
        let key = keys::session_key(session_id);
        let raw = self
            .bounded(self.backend.hget(&key, keys::TOKEN_PAIR_FIELD))
            .await?
            .map_err(SessionStoreError::Lookup)?
            .ok_or(SessionStoreError::NotFound)?;
        decode(&key, &raw)
    }

    /// Number of session ids recorded for an account, including ones whose
    /// tokens have already expired.
    pub async fn account_session_count(&self, account_id: AccountId) -> Result<usize, SessionStoreError> {
        let key = keys::account_sessions_key(account_id);
        self.bounded(self.backend.scard(&key))
            .await?
            .map_err(SessionStoreError::Lookup)
    }

    async fn bounded<T>(&self, op: impl Future<Output = T>) -> Result<T, SessionStoreError> {
        tokio::time::timeout(self.command_timeout, op)
            .await
            .map_err(|_| SessionStoreError::Timeout(self.command_timeout))
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, SessionStoreError> {
    serde_json::from_str(raw).map_err(|err| {
        tracing::error!(key, error = %err, "Corrupt session value in store");
        SessionStoreError::Corruption(err)
    })
}

/// First characters of a bearer token, enough to correlate log lines.
fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}… (len={})", token.len())
}
