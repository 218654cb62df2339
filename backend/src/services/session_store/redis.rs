use async_trait::async_trait;
use bb8_redis::redis::{self, AsyncCommands};

use super::backend::{BackendError, SessionBackend, SessionWrite};
use super::keys::TOKEN_PAIR_FIELD;
use crate::db::redis::RedisPool;

/// Session backend on a pooled Redis connection.
#[derive(Clone)]
pub struct RedisSessionBackend {
    pool: RedisPool,
}

impl RedisSessionBackend {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

// Redis rejects `EX 0`, so sub-second TTLs round up.
fn ttl_seconds(ttl: std::time::Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl SessionBackend for RedisSessionBackend {
    async fn write_session(&self, write: &SessionWrite) -> Result<(), BackendError> {
        let mut conn = self.pool.get().await?;

        // MULTI/EXEC: queued commands run back to back, no other client
        // observes an intermediate state.
        redis::pipe()
            .atomic()
            .set_ex(
                &write.access_token_key,
                &write.account_info,
                ttl_seconds(write.ttls.access_token),
            )
            .set_ex(
                &write.refresh_token_key,
                &write.account_info,
                ttl_seconds(write.ttls.refresh_token),
            )
            .hset(&write.session_key, TOKEN_PAIR_FIELD, &write.token_pair)
            .expire(
                &write.session_key,
                ttl_seconds(write.ttls.session_container()) as i64,
            )
            .sadd(&write.account_sessions_key, &write.session_id)
            .query_async::<_, ()>(&mut *conn)
            .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn scard(&self, key: &str) -> Result<usize, BackendError> {
        let mut conn = self.pool.get().await?;
        let count: usize = conn.scard(key).await?;
        Ok(count)
    }
}
