//! Session issuing and access-token verification.
//!
//! The only policy here is error reclassification: a missing or expired access
//! token becomes [`AuthError::PermissionDenied`], everything else passes
//! through untouched so the HTTP boundary can render it as an internal error.

use std::sync::Arc;
use thiserror::Error;

use crate::models::session::{AccountInfo, TokenPair};
use crate::services::session_store::{SessionStore, SessionStoreError};
use crate::types::AccountId;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn create_session(&self, account_id: AccountId) -> Result<TokenPair, AuthError> {
        Ok(self.store.create_session(account_id).await?)
    }

    pub async fn verify(&self, access_token: &str) -> Result<AccountInfo, AuthError> {
        match self.store.find_access_token(access_token).await {
            Ok(info) => Ok(info),
            Err(SessionStoreError::NotFound) => Err(AuthError::PermissionDenied),
            Err(err) => Err(AuthError::Store(err)),
        }
    }
}
