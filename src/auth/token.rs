use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of random bytes behind every refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Failures of the token lifecycle.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed token, unknown or already revoked refresh token.
    #[error("token is invalid")]
    Invalid,
    /// The token was well formed but is past its expiry.
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("token store error: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Represents the claims encoded within an access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i64,
    pub email: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// HMAC keys derived from the signing secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtKeys([redacted])")
    }
}

/// Signs an access token for `user_id` that expires after `ttl`.
pub fn generate_access_token(
    keys: &JwtKeys,
    user_id: i64,
    email: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verifies signature and expiry of an access token and returns its claims.
///
/// No leeway is granted on `exp`. Every failure other than expiry is reported
/// as [`TokenError::Invalid`].
pub fn verify_access_token(keys: &JwtKeys, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

/// Generates an opaque refresh token: 32 random bytes, base64url encoded.
pub fn generate_refresh_token() -> String {
    let bytes: [u8; REFRESH_TOKEN_BYTES] = rand::random();
    URL_SAFE.encode(bytes)
}
