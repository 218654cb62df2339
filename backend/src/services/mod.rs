pub mod auth;
pub mod session_store;
pub mod user;

pub use auth::{AuthError, AuthService};
pub use session_store::{SessionStore, SessionStoreError, SessionTtls};
pub use user::{UserError, UserService};
