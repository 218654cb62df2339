use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use identity_backend::{
    config::Config,
    db::{connection::create_pool, redis::create_redis_pool},
    repositories::PgUserRepository,
    router::build_router,
    services::{session_store::RedisSessionBackend, AuthService, SessionStore, UserService},
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %mask_secret(&config.database_url),
        redis_url = %mask_secret(&config.redis_url),
        access_token_expire_minutes = config.access_token_expire_minutes,
        refresh_token_expire_days = config.refresh_token_expire_days,
        session_grace_minutes = config.session_grace_minutes,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let db = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&*db).await?;

    // Session store
    let redis = create_redis_pool(&config).await?;
    let store = SessionStore::new(
        Arc::new(RedisSessionBackend::new(redis)),
        config.session_ttls()?,
        config.redis_command_timeout(),
    );
    let auth = AuthService::new(Arc::new(store));
    let users = UserService::new(Arc::new(PgUserRepository::new(db)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app_port));
    let app = build_router(AppState::new(auth, users, config));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
