//! Classified-advertisement HTTP API: user accounts, opaque session tokens
//! and ownership-scoped mutation of listings.

pub mod advertisements;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod state;
pub mod telemetry;
pub mod users;
