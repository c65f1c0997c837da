//! Access and refresh token lifecycle: issuance, verification, rotation and revocation.

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use sqlx::{Executor, Sqlite, SqlitePool};
use tokio::task::JoinHandle;

use super::token::{self, Claims, JwtKeys, TokenError};
use crate::models::{TokenPair, User};
use crate::repository::{refresh_tokens, users};

/// Lifetime of a refresh token.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Issues, verifies and rotates the credentials handed out to clients.
///
/// Cloning is cheap: the pool is reference counted and the keys are small.
#[derive(Clone, Debug)]
pub struct TokenService {
    pool: SqlitePool,
    keys: JwtKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(pool: SqlitePool, secret: &str, access_ttl_hours: i64) -> Self {
        Self {
            pool,
            keys: JwtKeys::from_secret(secret.as_bytes()),
            access_ttl: Duration::hours(access_ttl_hours),
            refresh_ttl: Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }

    /// Overrides the refresh token lifetime.
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Seconds an access token stays valid, as reported in `expires_in`.
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Signs an access token and persists a fresh refresh token for `user`.
    pub async fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        self.issue_pair_with(&self.pool, user).await
    }

    async fn issue_pair_with<'e, E>(&self, executor: E, user: &User) -> Result<TokenPair, TokenError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let access_token = token::generate_access_token(&self.keys, user.id, &user.email, self.access_ttl)?;
        let refresh_token = token::generate_refresh_token();
        refresh_tokens::create(executor, user.id, &refresh_token, Utc::now() + self.refresh_ttl).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_seconds(),
        })
    }

    pub fn verify_access(&self, access_token: &str) -> Result<Claims, TokenError> {
        token::verify_access_token(&self.keys, access_token)
    }

    /// Exchanges a live refresh token for a new pair, revoking the old one.
    ///
    /// Revocation and issuance commit together. An expired token is revoked
    /// and the call fails with [`TokenError::Expired`]; an unknown, revoked or
    /// concurrently rotated token fails with [`TokenError::Invalid`].
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, TokenError> {
        let mut tx = self.pool.begin().await?;

        // Claim before reading anything else: the write lock is taken first,
        // so a concurrent rotation of the same token waits and then finds it revoked.
        let claimed = match refresh_tokens::claim_active(&mut *tx, presented).await? {
            Some(claimed) => claimed,
            None => {
                debug!("Refresh token is unknown or already revoked");
                return Err(TokenError::Invalid);
            }
        };

        if claimed.is_expired_at(Utc::now()) {
            tx.commit().await?;
            info!("Refresh token {} of user {} presented after expiry", claimed.id, claimed.user_id);
            return Err(TokenError::Expired);
        }

        let user = match users::find_by_id(&mut *tx, claimed.user_id).await? {
            Some(user) => user,
            None => {
                warn!("Refresh token {} belongs to missing user {}", claimed.id, claimed.user_id);
                return Err(TokenError::Invalid);
            }
        };

        let pair = self.issue_pair_with(&mut *tx, &user).await?;
        tx.commit().await?;

        debug!("Rotated refresh token {} for user {}", claimed.id, user.id);
        Ok(pair)
    }

    /// Revokes every live refresh token of a user. Idempotent.
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, TokenError> {
        Ok(refresh_tokens::revoke_all_for_user(&self.pool, user_id).await?)
    }

    /// Soft-deletes refresh tokens that are past their expiry.
    pub async fn sweep_expired(&self) -> Result<u64, TokenError> {
        Ok(refresh_tokens::soft_delete_expired(&self.pool, Utc::now()).await?)
    }
}

/// Spawns a background task that sweeps expired refresh tokens every `period`.
pub fn spawn_expiry_sweeper(tokens: TokenService, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match tokens.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => info!("Swept {} expired refresh tokens", removed),
                Err(e) => warn!("Refresh token sweep failed: {}", e),
            }
        }
    })
}
