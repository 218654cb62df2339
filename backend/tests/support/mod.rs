#![allow(dead_code)]
use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use identity_backend::{
    config::Config,
    models::user::{NewUser, User},
    repositories::{UserRepository, UserRepositoryError},
    router::build_router,
    services::{
        session_store::MemorySessionBackend, AuthService, SessionStore, SessionTtls, UserService,
    },
    state::AppState,
    types::AccountId,
};

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        redis_url: "redis://127.0.0.1:6379".into(),
        redis_pool_size: 2,
        redis_connect_timeout: 1,
        redis_command_timeout_ms: 1000,
        access_token_expire_minutes: 30,
        refresh_token_expire_days: 7,
        session_grace_minutes: 5,
        app_port: 0,
        cors_allow_origins: vec!["*".into()],
    }
}

pub fn memory_store(ttls: SessionTtls) -> (Arc<MemorySessionBackend>, Arc<SessionStore>) {
    let backend = Arc::new(MemorySessionBackend::new());
    let store = SessionStore::new(backend.clone(), ttls, Duration::from_secs(1));
    (backend, Arc::new(store))
}

/// Users kept in a vector, enforcing the same uniqueness rules as Postgres.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create_user(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.user_name == user.user_name) {
            return Err(UserRepositoryError::UserNameTaken);
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(UserRepositoryError::EmailTaken);
        }
        let created = User {
            id: AccountId::new(users.len() as u64 + 1),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemorySessionBackend>,
    pub store: Arc<SessionStore>,
}

pub fn test_app() -> TestApp {
    let (backend, store) = memory_store(SessionTtls::default());
    let auth = AuthService::new(store.clone());
    let users = UserService::new(Arc::new(InMemoryUsers::default()));
    let router = build_router(AppState::new(auth, users, test_config()));
    TestApp {
        router,
        backend,
        store,
    }
}
