#![doc = "The `todolist` library crate."]
#![doc = ""]
#![doc = "A multi-tenant todo service: credential storage, JWT access tokens with"]
#![doc = "rotating refresh tokens, owner-scoped todo queries, a bounded background"]
#![doc = "notification queue and per-client rate limiting. The binary (`main.rs`)"]
#![doc = "wires these into an actix-web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notifications;
pub mod rate_limit;
pub mod repository;
pub mod response;
pub mod routes;
pub mod state;

pub use crate::error::{AppError, AppResult};
pub use crate::state::AppState;
