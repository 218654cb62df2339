//! Values stored for an active session.

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Identity resolved from an access or refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub session_id: String,
}

/// Bearer credentials handed to the client after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
