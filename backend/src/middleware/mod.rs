pub mod auth;
pub mod logging;

pub use auth::*;
pub use logging::*;
