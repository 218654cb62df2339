//! Random identifiers for sessions.

use rand::{rngs::OsRng, RngCore};

pub const ACCESS_TOKEN_BYTES: usize = 16;
pub const REFRESH_TOKEN_BYTES: usize = 24;
pub const SESSION_ID_BYTES: usize = 24;

/// Source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand::Error>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Freshly minted, mutually independent identifiers for one session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
}

impl SessionTokens {
    pub fn generate(source: &dyn RandomSource) -> Result<Self, rand::Error> {
        Ok(Self {
            access_token: random_hex(source, ACCESS_TOKEN_BYTES)?,
            refresh_token: random_hex(source, REFRESH_TOKEN_BYTES)?,
            session_id: random_hex(source, SESSION_ID_BYTES)?,
        })
    }
}

fn random_hex(source: &dyn RandomSource, len: usize) -> Result<String, rand::Error> {
    let mut buf = vec![0u8; len];
    source.try_fill(&mut buf)?;
    Ok(hex::encode(buf))
}
