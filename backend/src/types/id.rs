//! Typed identifier for user accounts.
//!
//! Accounts are keyed by the `BIGSERIAL` primary key of the `users` table but
//! exposed as an unsigned integer everywhere else (session keys, JSON payloads).

use serde::{Deserialize, Serialize};
use sqlx::{
    error::BoxDynError,
    postgres::{PgTypeInfo, PgValueRef},
    Decode, Postgres, Type,
};
use std::fmt;
use std::num::{ParseIntError, TryFromIntError};
use std::str::FromStr;

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<AccountId> for u64 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl TryFrom<i64> for AccountId {
    type Error = TryFromIntError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Ok(Self(u64::try_from(raw)?))
    }
}

// Postgres has no unsigned integers; ids are stored as BIGINT.
impl Type<Postgres> for AccountId {
    fn type_info() -> PgTypeInfo {
        <i64 as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <i64 as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for AccountId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <i64 as Decode<'r, Postgres>>::decode(value)?;
        Ok(Self::try_from(raw)?)
    }
}
