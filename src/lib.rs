//! tinyrest - small HTTP/1.1 REST server
//!
//! Hand-rolled request parsing over raw TCP, ordered regex routing, a static
//! file fallback with a watched in-memory cache, and an idle-expiring list
//! for session bookkeeping.

pub mod api;
pub mod collections;
pub mod config;
pub mod http;
pub mod routing;
pub mod server;
