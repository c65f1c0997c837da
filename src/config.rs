use std::env;
use std::time::Duration;

const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";

/// Runtime configuration, read once at startup and passed to every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    pub cors_origin: String,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    pub notification_queue_capacity: usize,
    pub reminder_interval: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Every setting has a default; unparsable numbers fall back to it.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_SECRET is not set, falling back to the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://todo.db?mode=rwc".to_string()),
            server_port: get("SERVER_PORT")
                .or_else(|| get("PORT"))
                .and_then(|port| port.parse().ok())
                .unwrap_or(8080),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_expiry_hours: parse_or(get("JWT_EXPIRY_HOURS"), 24),
            bcrypt_cost: parse_or(get("BCRYPT_COST"), bcrypt::DEFAULT_COST),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:4200".to_string()),
            rate_limit_requests: parse_or(get("RATE_LIMIT_REQUESTS"), 100),
            rate_limit_window: Duration::from_secs(parse_or(get("RATE_LIMIT_WINDOW_SECS"), 60)),
            notification_queue_capacity: parse_or(get("NOTIFICATION_QUEUE_CAPACITY"), 100),
            reminder_interval: Duration::from_secs(parse_or(get("REMINDER_INTERVAL_SECS"), 300)),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
