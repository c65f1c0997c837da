#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{http::StatusCode, test, web, App};
use futures::future::BoxFuture;
use serde_json::{json, Value};

use todolist::auth::TokenService;
use todolist::notifications::{Notification, NotificationHandler, NotificationQueue};
use todolist::{db, routes, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "Password123!";
// Minimum bcrypt cost, keeps registration fast.
const TEST_BCRYPT_COST: u32 = 4;

/// Records every notification the worker processes.
#[derive(Clone, Default)]
pub struct Recorder {
    pub seen: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationHandler for Recorder {
    fn handle(&self, notification: Notification) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(notification);
            Ok(())
        })
    }
}

impl Recorder {
    /// Polls until `pred` holds for the recorded notifications, or one second passes.
    pub async fn wait_for<F>(&self, pred: F) -> Vec<Notification>
    where
        F: Fn(&[Notification]) -> bool,
    {
        for _ in 0..100 {
            {
                let seen = self.seen.lock().unwrap();
                if pred(seen.as_slice()) {
                    return seen.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.seen.lock().unwrap().clone()
    }
}

/// Fresh in-memory database, token service and a worker feeding a [`Recorder`].
pub async fn test_state() -> (web::Data<AppState>, Recorder) {
    let pool = db::connect_in_memory().await.expect("in-memory database");
    db::migrate(&pool).await.expect("migrations");

    let (notifications, worker) = NotificationQueue::bounded(100);
    let recorder = Recorder::default();
    let _ = worker.spawn(recorder.clone());

    let tokens = TokenService::new(pool.clone(), TEST_SECRET, 24);
    let state = AppState::new(pool, tokens, notifications, TEST_BCRYPT_COST);
    (web::Data::new(state), recorder)
}

pub async fn test_app(
    state: web::Data<AppState>,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(state)
            .service(web::scope("/api").configure(routes::config)),
    )
    .await
}

/// Sends a request and returns the status with the parsed JSON body.
pub async fn send(
    app: &impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    req: test::TestRequest,
) -> (StatusCode, Value) {
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub struct TestUser {
    pub id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn register_user(
    app: &impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    email: &str,
    name: &str,
) -> TestUser {
    let (status, body) = send(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "email": email,
            "password": TEST_PASSWORD,
            "name": name
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

    TestUser {
        id: body["data"]["user"]["id"].as_i64().unwrap(),
        access_token: body["data"]["tokens"]["access_token"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["tokens"]["refresh_token"].as_str().unwrap().to_string(),
    }
}
