//! In-process session backend with key expiry and fault injection.
//!
//! Mirrors the Redis semantics the store relies on: `SET EX`, `HSET` +
//! `EXPIRE`, `SADD`, lazy expiry on read, and all-or-nothing session writes.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::backend::{BackendError, SessionBackend, SessionWrite};
use super::keys::TOKEN_PAIR_FIELD;

/// Failure to inject into subsequent backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Every call fails before touching any key.
    Unavailable,
    /// Session writes fail after `n` of their five commands were applied.
    /// Reads are unaffected.
    AtStep(usize),
}

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    failure: Option<InjectedFailure>,
}

#[derive(Default)]
pub struct MemorySessionBackend {
    state: Mutex<State>,
}

enum Command<'a> {
    SetEx(&'a str, &'a str, Duration),
    HSet(&'a str, &'a str, &'a str),
    Expire(&'a str, Duration),
    SAdd(&'a str, &'a str),
}

impl Command<'_> {
    fn key(&self) -> &str {
        match *self {
            Command::SetEx(key, ..)
            | Command::HSet(key, ..)
            | Command::Expire(key, _)
            | Command::SAdd(key, _) => key,
        }
    }
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_failure(&self, failure: InjectedFailure) {
        self.lock().failure = Some(failure);
    }

    pub fn clear_failure(&self) {
        self.lock().failure = None;
    }

    /// Whether `key` exists and has not expired.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Remaining lifetime of `key`; `None` when missing or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let state = self.lock();
        let entry = state.entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|at| at - now)
    }

    pub fn set_members(&self, key: &str) -> HashSet<String> {
        let now = Instant::now();
        match self.lock().entries.get(key) {
            Some(Entry {
                value: Value::Set(members),
                expires_at,
            }) if expires_at.map_or(true, |at| at > now) => members.clone(),
            _ => HashSet::new(),
        }
    }

    pub fn key_count(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .entries
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Writes a string key directly, bypassing the session store.
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        let now = Instant::now();
        apply(
            &mut self.lock().entries,
            &Command::SetEx(key, value, ttl),
            now,
        );
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the backend for the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(state: &State) -> Result<(), BackendError> {
        match state.failure {
            Some(InjectedFailure::Unavailable) => Err(BackendError::Unavailable(
                "connection refused".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn live<'a>(state: &'a State, key: &str) -> Option<&'a Entry> {
        let now = Instant::now();
        state.entries.get(key).filter(|entry| entry.is_live(now))
    }
}

// Expired keys behave as absent for every write.
fn take_live(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<Entry> {
    entries.remove(key).filter(|entry| entry.is_live(now))
}

fn apply(entries: &mut HashMap<String, Entry>, command: &Command<'_>, now: Instant) {
    match *command {
        Command::SetEx(key, value, ttl) => {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Str(value.to_string()),
                    expires_at: Some(now + ttl),
                },
            );
        }
        Command::HSet(key, field, value) => {
            let mut entry = match take_live(entries, key, now) {
                Some(entry @ Entry { value: Value::Hash(_), .. }) => entry,
                _ => Entry {
                    value: Value::Hash(HashMap::new()),
                    expires_at: None,
                },
            };
            if let Value::Hash(fields) = &mut entry.value {
                fields.insert(field.to_string(), value.to_string());
            }
            entries.insert(key.to_string(), entry);
        }
        Command::Expire(key, ttl) => {
            if let Some(mut entry) = take_live(entries, key, now) {
                entry.expires_at = Some(now + ttl);
                entries.insert(key.to_string(), entry);
            }
        }
        Command::SAdd(key, member) => {
            let mut entry = match take_live(entries, key, now) {
                Some(entry @ Entry { value: Value::Set(_), .. }) => entry,
                _ => Entry {
                    value: Value::Set(HashSet::new()),
                    expires_at: None,
                },
            };
            if let Value::Set(members) = &mut entry.value {
                members.insert(member.to_string());
            }
            entries.insert(key.to_string(), entry);
        }
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn write_session(&self, write: &SessionWrite) -> Result<(), BackendError> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let commands = [
            Command::SetEx(
                &write.access_token_key,
                &write.account_info,
                write.ttls.access_token,
            ),
            Command::SetEx(
                &write.refresh_token_key,
                &write.account_info,
                write.ttls.refresh_token,
            ),
            Command::HSet(&write.session_key, TOKEN_PAIR_FIELD, &write.token_pair),
            Command::Expire(&write.session_key, write.ttls.session_container()),
            Command::SAdd(&write.account_sessions_key, &write.session_id),
        ];

        // Stage the touched keys and publish only when every command succeeded.
        let now = Instant::now();
        let mut staged: HashMap<String, Entry> = commands
            .iter()
            .filter_map(|command| {
                let key = command.key();
                state
                    .entries
                    .get(key)
                    .map(|entry| (key.to_string(), entry.clone()))
            })
            .collect();
        for (step, command) in commands.iter().enumerate() {
            if state.failure == Some(InjectedFailure::AtStep(step)) {
                return Err(BackendError::Unavailable(format!(
                    "connection reset while applying command {step}"
                )));
            }
            apply(&mut staged, command, now);
        }
        state.entries.extend(staged);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(match Self::live(&state, key) {
            Some(Entry {
                value: Value::Str(value),
                ..
            }) => Some(value.clone()),
            _ => None,
        })
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, BackendError> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(match Self::live(&state, key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => fields.get(field).cloned(),
            _ => None,
        })
    }

    async fn scard(&self, key: &str) -> Result<usize, BackendError> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(match Self::live(&state, key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => members.len(),
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_store::SessionTtls;

    fn sample_write() -> SessionWrite {
        SessionWrite {
            access_token_key: "identity:at:a".into(),
            refresh_token_key: "identity:rt:r".into(),
            session_key: "identity:sid:s".into(),
            account_sessions_key: "identity:user:sids:1".into(),
            session_id: "s".into(),
            account_info: "{}".into(),
            token_pair: "{}".into(),
            ttls: SessionTtls {
                access_token: Duration::from_secs(60),
                refresh_token: Duration::from_secs(120),
                session_grace: Duration::from_secs(10),
            },
        }
    }

    #[tokio::test]
    async fn write_session_sets_all_keys_with_ttls() {
        let backend = MemorySessionBackend::new();
        backend.write_session(&sample_write()).await.unwrap();

        assert!(backend.ttl("identity:at:a").unwrap() <= Duration::from_secs(60));
        assert!(backend.ttl("identity:rt:r").unwrap() > Duration::from_secs(60));
        assert!(backend.ttl("identity:sid:s").unwrap() > Duration::from_secs(120));
        assert!(backend.contains_key("identity:user:sids:1"));
        assert_eq!(backend.ttl("identity:user:sids:1"), None);
        assert_eq!(
            backend.hget("identity:sid:s", TOKEN_PAIR_FIELD).await.unwrap(),
            Some("{}".to_string())
        );
    }

    #[tokio::test]
    async fn failure_at_any_step_leaves_no_trace() {
        for step in 0..5 {
            let backend = MemorySessionBackend::new();
            backend.inject_failure(InjectedFailure::AtStep(step));
            assert!(backend.write_session(&sample_write()).await.is_err());
            assert_eq!(backend.key_count(), 0, "step {step} leaked a key");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_read_as_missing() {
        let backend = MemorySessionBackend::new();
        backend.insert_raw("k", "v", Duration::from_secs(5));
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(!backend.contains_key("k"));
    }

    #[tokio::test]
    async fn unavailable_backend_fails_reads() {
        let backend = MemorySessionBackend::new();
        backend.inject_failure(InjectedFailure::Unavailable);
        assert!(matches!(
            backend.get("k").await,
            Err(BackendError::Unavailable(_))
        ));
        backend.clear_failure();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }
}
