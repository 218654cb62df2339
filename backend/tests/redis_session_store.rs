use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use bb8_redis::redis::AsyncCommands;
use testcontainers::{clients::Cli, core::WaitFor, GenericImage, RunnableImage};
use identity_backend::{
    db::redis::create_redis_pool,
    services::{
        session_store::{keys, RedisSessionBackend},
        AuthError, AuthService, SessionStore, SessionStoreError, SessionTtls,
    },
    types::AccountId,
};

mod support;

fn allocate_ephemeral_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("read socket addr")
        .port()
}

#[tokio::test]
async fn redis_session_store_roundtrip() {
    let docker = Cli::default();
    let host_port = allocate_ephemeral_port();
    let image = GenericImage::new("redis", "7-alpine")
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));
    let image = RunnableImage::from(image).with_mapped_port((host_port, 6379));
    let _container = docker.run(image);

    let mut config = support::test_config();
    config.redis_url = format!("redis://127.0.0.1:{host_port}");
    config.redis_connect_timeout = 5;

    let pool = create_redis_pool(&config).await.expect("create redis pool");
    let ttls = SessionTtls {
        access_token: Duration::from_secs(1800),
        refresh_token: Duration::from_secs(7 * 24 * 3600),
        session_grace: Duration::from_secs(300),
    };
    let store = SessionStore::new(
        Arc::new(RedisSessionBackend::new(pool.clone())),
        ttls,
        Duration::from_secs(5),
    );
    let auth = AuthService::new(Arc::new(store));

    let account_id = AccountId::new(42);
    let pair = auth.create_session(account_id).await.expect("create session");
    let info = auth.verify(&pair.access_token).await.expect("verify");
    assert_eq!(info.account_id, account_id);

    let mut conn = pool.get().await.expect("redis connection");
    let at_ttl: i64 = conn
        .ttl(keys::access_token_key(&pair.access_token))
        .await
        .expect("ttl at");
    let rt_ttl: i64 = conn
        .ttl(keys::refresh_token_key(&pair.refresh_token))
        .await
        .expect("ttl rt");
    let sid_ttl: i64 = conn
        .ttl(keys::session_key(&info.session_id))
        .await
        .expect("ttl sid");
    let set_ttl: i64 = conn
        .ttl(keys::account_sessions_key(account_id))
        .await
        .expect("ttl set");
    assert!(at_ttl > 1700 && at_ttl <= 1800);
    assert!(rt_ttl > 7 * 24 * 3600 - 100 && rt_ttl <= 7 * 24 * 3600);
    assert!(sid_ttl > rt_ttl && sid_ttl <= 7 * 24 * 3600 + 300);
    assert_eq!(set_ttl, -1);

    let refresh_value: String = conn
        .get(keys::refresh_token_key(&pair.refresh_token))
        .await
        .expect("refresh value");
    let refresh_info: serde_json::Value = serde_json::from_str(&refresh_value).unwrap();
    assert_eq!(refresh_info["account_id"], 42);
    assert_eq!(refresh_info["session_id"], info.session_id.as_str());

    assert_eq!(
        auth.store().find_session(&info.session_id).await.expect("session"),
        pair
    );

    auth.create_session(account_id).await.expect("second session");
    assert_eq!(
        auth.store().account_session_count(account_id).await.unwrap(),
        2
    );

    // Garbage under a token key is corruption, never "not found".
    conn.set::<_, _, ()>(keys::access_token_key("corrupt"), "{")
        .await
        .expect("write garbage");
    assert!(matches!(
        auth.verify("corrupt").await,
        Err(AuthError::Store(SessionStoreError::Corruption(_)))
    ));
    assert!(matches!(
        auth.verify("nonexistent-token").await,
        Err(AuthError::PermissionDenied)
    ));
}

#[tokio::test]
async fn unreachable_redis_fails_creation_and_lookup() {
    let mut config = support::test_config();
    config.redis_url = "redis://127.0.0.1:1".to_string();
    config.redis_pool_size = 1;
    config.redis_connect_timeout = 1;

    let pool = create_redis_pool(&config).await.expect("pool builder");
    let store = SessionStore::new(
        Arc::new(RedisSessionBackend::new(pool)),
        SessionTtls::default(),
        Duration::from_secs(3),
    );
    let auth = AuthService::new(Arc::new(store));

    let err = auth.create_session(AccountId::new(1)).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Store(SessionStoreError::SessionCreation(_))
            | AuthError::Store(SessionStoreError::Timeout(_))
    ));

    let err = auth.verify("whatever").await.unwrap_err();
    assert!(!matches!(err, AuthError::PermissionDenied));
}
