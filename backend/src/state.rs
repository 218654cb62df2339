use std::sync::Arc;

use crate::{
    config::Config,
    services::{AuthService, UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(auth: AuthService, users: UserService, config: Config) -> Self {
        Self {
            auth,
            users,
            config: Arc::new(config),
        }
    }
}
