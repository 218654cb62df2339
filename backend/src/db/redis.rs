use crate::config::Config;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use std::time::Duration;

pub type RedisPool = Pool<RedisConnectionManager>;

/// Builds the connection pool backing the session store.
///
/// No idle connections are kept warm, so an unreachable server surfaces on
/// the first `pool.get()` rather than here.
pub async fn create_redis_pool(config: &Config) -> anyhow::Result<RedisPool> {
    let manager = RedisConnectionManager::new(config.redis_url.clone())?;
    let pool = Pool::builder()
        .max_size(config.redis_pool_size)
        .connection_timeout(Duration::from_secs(config.redis_connect_timeout))
        .build(manager)
        .await?;

    tracing::info!(
        "Redis connection pool created (size: {})",
        config.redis_pool_size
    );
    Ok(pool)
}
