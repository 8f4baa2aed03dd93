//! Per-IP rate limiting.
//!
//! Each client address gets three GCRA buckets (see
//! [`RateLimitConfig`]): reads, writes and login attempts. Over-quota
//! requests get `429` with `Retry-After` and never reach a handler.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::ApiError;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

type Gcra = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const LOGIN_PATH: &str = "/api/auth/login";

/// Which quota a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Read,
    Write,
    Login,
}

impl RequestClass {
    pub fn of(method: &Method, path: &str) -> Self {
        match *method {
            Method::GET | Method::HEAD | Method::OPTIONS => RequestClass::Read,
            Method::POST if path == LOGIN_PATH => RequestClass::Login,
            _ => RequestClass::Write,
        }
    }
}

fn at_least_one(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

struct ClientBuckets {
    reads: Gcra,
    writes: Gcra,
    logins: Gcra,
    last_seen: Instant,
}

impl ClientBuckets {
    fn new(config: &RateLimitConfig) -> Self {
        let per_second = |rate, burst| {
            RateLimiter::direct(Quota::per_second(at_least_one(rate)).allow_burst(at_least_one(burst)))
        };
        Self {
            reads: per_second(config.reads_per_second, config.read_burst),
            writes: per_second(config.writes_per_second, config.write_burst),
            logins: RateLimiter::direct(Quota::per_minute(at_least_one(config.logins_per_minute))),
            last_seen: Instant::now(),
        }
    }

    fn take(&mut self, class: RequestClass) -> Result<(), Duration> {
        self.last_seen = Instant::now();
        let bucket = match class {
            RequestClass::Read => &self.reads,
            RequestClass::Write => &self.writes,
            RequestClass::Login => &self.logins,
        };
        bucket
            .check()
            .map_err(|denied| denied.wait_time_from(DefaultClock::default().now()))
    }
}

/// Buckets for every client seen recently.
pub struct RateLimitState {
    clients: DashMap<IpAddr, ClientBuckets>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            clients: DashMap::new(),
            config,
        }
    }

    /// `Err` carries how long the client should wait.
    pub fn check(&self, ip: IpAddr, class: RequestClass) -> Result<(), Duration> {
        if !self.config.enabled || self.config.whitelist.contains(&ip) {
            return Ok(());
        }
        self.clients
            .entry(ip)
            .or_insert_with(|| {
                debug!(%ip, "Tracking new client");
                ClientBuckets::new(&self.config)
            })
            .take(class)
    }

    /// Forget clients idle for longer than `max_idle`.
    pub fn sweep(&self, max_idle: Duration) {
        let before = self.clients.len();
        self.clients
            .retain(|_, buckets| buckets.last_seen.elapsed() <= max_idle);
        let swept = before.saturating_sub(self.clients.len());
        if swept > 0 {
            debug!(swept, remaining = self.clients.len(), "Swept idle rate limit buckets");
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// The address a request is accounted to.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
        if self.config.trust_forwarded {
            if let Some(ip) = forwarded_ip(headers) {
                return ip;
            }
        }
        peer.map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |addr| addr.ip())
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .or_else(|| header("x-real-ip"))
        .and_then(|ip| ip.trim().parse().ok())
}

#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(config)),
        }
    }

    /// Shared with the sweeper task.
    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let ip = self.state.client_ip(req.headers(), peer);
        let class = RequestClass::of(req.method(), req.uri().path());

        if let Err(wait) = self.state.check(ip, class) {
            let retry_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
            warn!(%ip, ?class, retry_after_ms = retry_ms, "Rate limit exceeded");
            return Box::pin(async move { Ok(ApiError::rate_limited(retry_ms).into_response()) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

/// Sweep idle buckets every `interval` until the task is aborted.
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        state.sweep(state.config.bucket_idle);
    }
}
