pub mod auth;
pub mod health;
pub mod todos;

use actix_web::{error, web};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Registers every API route. Mounted under `/api` by the binary.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .service(health::health)
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::refresh)
                .service(
                    web::resource("/logout")
                        .route(web::post().to(auth::logout))
                        .wrap(AuthMiddleware),
                ),
        )
        .service(
            web::resource("/profile")
                .route(web::get().to(auth::profile))
                .wrap(AuthMiddleware),
        )
        .service(
            web::scope("/todos")
                .wrap(AuthMiddleware)
                .service(todos::list_todos)
                .service(todos::create_todo)
                .service(todos::get_todo)
                .service(todos::update_todo)
                .service(todos::delete_todo),
        );
}

/// Malformed JSON bodies are reported with the standard 400 envelope.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: error::JsonPayloadError, _req| {
        AppError::Validation(format!("Invalid input: {}", err)).into()
    })
}

/// The only path parameter is a todo id; anything non-numeric is a 400.
fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::Validation("Invalid todo ID".into()).into())
}
