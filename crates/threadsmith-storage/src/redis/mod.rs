//! Redis-backed store

mod backend;
mod config;

pub use backend::RemoteStore;
pub use config::RemoteConfig;
