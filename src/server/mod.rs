//! Listener, per-connection service and the static file fallback.

pub mod file_cache;
pub mod listener;
pub mod service;
pub mod static_files;

pub use listener::Server;
