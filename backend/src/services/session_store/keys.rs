//! Key schema for session data.
//!
//! Every entity type gets its own prefix under the `identity` namespace so the
//! four facts of a session stay independently addressable while still being
//! scannable per type (`identity:at:*`, `identity:user:sids:*`, ...).

use crate::types::AccountId;

const ACCESS_TOKEN_PREFIX: &str = "identity:at";
const REFRESH_TOKEN_PREFIX: &str = "identity:rt";
const SESSION_PREFIX: &str = "identity:sid";
const ACCOUNT_SESSIONS_PREFIX: &str = "identity:user:sids";

/// Hash field of the session container holding the serialized token pair.
pub const TOKEN_PAIR_FIELD: &str = "token_pair";

pub fn access_token_key(access_token: &str) -> String {
    format!("{ACCESS_TOKEN_PREFIX}:{access_token}")
}

pub fn refresh_token_key(refresh_token: &str) -> String {
    format!("{REFRESH_TOKEN_PREFIX}:{refresh_token}")
}

pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_PREFIX}:{session_id}")
}

pub fn account_sessions_key(account_id: AccountId) -> String {
    format!("{ACCOUNT_SESSIONS_PREFIX}:{account_id}")
}
