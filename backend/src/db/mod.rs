pub mod connection;
pub mod redis;
