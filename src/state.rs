use sqlx::SqlitePool;

use crate::auth::TokenService;
use crate::notifications::NotificationQueue;

/// Shared handles every request handler needs, registered once as `web::Data`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub tokens: TokenService,
    pub notifications: NotificationQueue,
    /// bcrypt work factor used when hashing new passwords.
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        tokens: TokenService,
        notifications: NotificationQueue,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            pool,
            tokens,
            notifications,
            bcrypt_cost,
        }
    }
}
