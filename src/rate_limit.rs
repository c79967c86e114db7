//! Per-client sliding window rate limiting.
//!
//! The limiter keeps, for every client identifier, the instants of its
//! admitted requests inside the trailing window. State lives in process
//! memory only and is lost on restart.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Admits or rejects a request from `client_id` arriving at `now`.
    ///
    /// On rejection returns how long the client has to wait until the oldest
    /// request in its window expires.
    pub fn admit(&self, client_id: &str, now: Instant) -> Result<(), Duration> {
        // A poisoned lock still holds consistent timestamps.
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        let window_start = now.checked_sub(self.window);
        let timestamps = clients.entry(client_id.to_string()).or_default();

        if let Some(start) = window_start {
            while timestamps.front().is_some_and(|t| *t <= start) {
                timestamps.pop_front();
            }
        }

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let wait = (oldest + self.window).saturating_duration_since(now);
            return Err(wait);
        }

        timestamps.push_back(now);
        Ok(())
    }

    pub fn check(&self, client_id: &str) -> Result<(), Duration> {
        self.admit(client_id, Instant::now())
    }

    /// Drops clients whose whole window has expired.
    pub fn sweep(&self, now: Instant) {
        let Some(start) = now.checked_sub(self.window) else {
            return;
        };
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.retain(|_, timestamps| timestamps.back().is_some_and(|t| *t > start));
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Middleware rejecting requests once the peer address exhausts its window.
pub async fn enforce(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_id = addr.ip().to_string();

    if let Err(retry_after) = state.rate_limiter.check(&client_id) {
        tracing::warn!(client = %client_id, path = %request.uri().path(), "rate limit exceeded");
        return Err(AppError::RateLimitExceeded { retry_after });
    }

    Ok(next.run(request).await)
}
