use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;

use super::extractors::AuthenticatedUser;
use super::service::TokenService;
use crate::error::AppError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Resolves the caller from an `Authorization` header value.
///
/// The scheme must be exactly `Bearer ` (case-sensitive). Every verification
/// failure yields the same error so callers cannot tell a malformed token from
/// an expired one.
pub fn authenticate(
    authorization: Option<&str>,
    tokens: &TokenService,
) -> Result<AuthenticatedUser, AppError> {
    let value = authorization
        .ok_or_else(|| AppError::Unauthenticated("Authorization header required".into()))?;
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| AppError::Unauthenticated("Invalid authorization header format".into()))?;

    match tokens.verify_access(token) {
        Ok(claims) => Ok(AuthenticatedUser {
            id: claims.sub,
            email: claims.email,
        }),
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            Err(AppError::Unauthenticated("Invalid or expired token".into()))
        }
    }
}

/// Guards a scope or resource: requests without a valid access token are
/// answered with 401 before reaching the handler.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = match req.app_data::<web::Data<AppState>>() {
            Some(state) => {
                let authorization = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok());
                authenticate(authorization, &state.tokens)
            }
            None => Err(AppError::Internal("Application state is not registered".into())),
        };

        match outcome {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                let (request, _) = req.into_parts();
                let response = HttpResponse::from_error(app_err).map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            }
        }
    }
}
