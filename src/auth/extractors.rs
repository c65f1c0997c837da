use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::error::AppError;

/// The caller identity established by `AuthMiddleware`.
///
/// Handlers on protected routes take this as an argument; it is read from the
/// request extensions where the middleware placed it after verifying the
/// bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => {
                // Route is missing AuthMiddleware.
                let err = AppError::Unauthenticated("Authorization required".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
