//! Per-client request budgets.
//!
//! Each client key (the peer IP) gets `rate` requests per fixed window. The
//! counters live in memory only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::error::AppError;

/// Source of the current instant, replaceable in tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct Visitor {
    remaining: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    visitors: Mutex<HashMap<String, Visitor>>,
    rate: u32,
    window: Duration,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(rate: u32, window: Duration) -> Self {
        Self::with_clock(rate, window, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(rate: u32, window: Duration, clock: C) -> Self {
        Self {
            visitors: Mutex::new(HashMap::new()),
            rate,
            window,
            clock,
        }
    }

    /// Spends one request from `key`'s budget, refilling it when the window
    /// has elapsed. Returns false once the budget is exhausted.
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);

        let visitor = visitors.entry(key.to_string()).or_insert(Visitor {
            remaining: self.rate,
            window_start: now,
        });

        if now.duration_since(visitor.window_start) > self.window {
            visitor.remaining = self.rate;
            visitor.window_start = now;
        }

        if visitor.remaining > 0 {
            visitor.remaining -= 1;
            true
        } else {
            false
        }
    }

    /// Forgets visitors whose window started more than two windows ago.
    /// Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let idle = self.window * 2;
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);

        let before = visitors.len();
        visitors.retain(|_, v| now.duration_since(v.window_start) <= idle);
        before - visitors.len()
    }

    pub fn tracked(&self) -> usize {
        self.visitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Spawns a background task that calls [`RateLimiter::sweep`] every `period`.
pub fn spawn_sweeper<C: Clock>(limiter: Arc<RateLimiter<C>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = limiter.sweep();
            if evicted > 0 {
                debug!("Rate limiter evicted {} idle clients", evicted);
            }
        }
    })
}

/// Middleware answering 429 once the client's budget is spent.
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service,
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: S,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
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
        // Forwarded headers are client-controlled, so only the socket peer counts.
        let key = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if self.limiter.allow(&key) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        warn!("Rate limit exceeded for {}", key);
        let (request, _) = req.into_parts();
        let response = HttpResponse::from_error(AppError::RateLimited(
            "Rate limit exceeded. Please try again later.".into(),
        ))
        .map_into_right_body();
        Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
    }
}
