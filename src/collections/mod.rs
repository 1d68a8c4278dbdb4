//! Containers shared between request handlers.

pub mod expiring;

pub use expiring::ExpiringList;
