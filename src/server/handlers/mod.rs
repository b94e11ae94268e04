pub mod chat;
pub mod config;
pub mod health;
pub mod sessions;
