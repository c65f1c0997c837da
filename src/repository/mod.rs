//! Data access for the three persisted entities.
//!
//! `users` and `refresh_tokens` form the credential store: plain persistence
//! with no expiry or revocation policy (that lives in [`crate::auth::service`]).
//! `todos` is the owner-scoped query engine.
//!
//! Functions take any SQLite executor so callers can run them on the pool or
//! inside a transaction.

pub mod refresh_tokens;
pub mod todos;
pub mod users;
