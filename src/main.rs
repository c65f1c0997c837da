use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use log::{info, warn};

use todolist::{
    auth::{spawn_expiry_sweeper, TokenService},
    config::Config,
    db,
    notifications::{spawn_reminder_ticker, LogDueSoonScan, LogNotifier, NotificationQueue},
    rate_limit::{self, RateLimit, RateLimiter},
    routes, AppState,
};

const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    let pool = db::connect(&config.database_url).await.map_err(io::Error::other)?;
    db::migrate(&pool).await.map_err(io::Error::other)?;
    info!("Database ready");

    let (notifications, worker) = NotificationQueue::bounded(config.notification_queue_capacity);
    let worker_handle = worker.spawn(LogNotifier::default());
    let reminder_handle = spawn_reminder_ticker(config.reminder_interval, LogDueSoonScan);

    let tokens = TokenService::new(pool.clone(), &config.jwt_secret, config.jwt_expiry_hours);
    let token_sweeper = spawn_expiry_sweeper(tokens.clone(), TOKEN_SWEEP_INTERVAL);

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_requests,
        config.rate_limit_window,
    ));
    let limiter_sweeper = rate_limit::spawn_sweeper(limiter.clone(), RATE_LIMIT_SWEEP_INTERVAL);

    let state = web::Data::new(AppState::new(pool, tokens, notifications, config.bcrypt_cost));
    let cors_origin = config.cors_origin.clone();

    info!("Starting server at {}", config.server_url());
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
            .expose_headers(vec![header::CONTENT_LENGTH])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(RateLimit::new(limiter.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .shutdown_timeout(5)
    .run()
    .await?;

    reminder_handle.abort();
    token_sweeper.abort();
    limiter_sweeper.abort();

    // The worker exits once every queue handle held by the app is dropped.
    if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker_handle).await.is_err() {
        warn!("Notification worker did not drain before shutdown");
    }

    info!("Server stopped");
    Ok(())
}
