// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-client rate limiting of the public activation endpoint.
//!
//! Clients are keyed by the first `X-Forwarded-For` entry when a proxy sets
//! one, else by the peer address of the connection.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::Clock, DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::error::ApiError;

pub const RATE_LIMITED_DETAIL: &str = "Rate limit exceeded. Try again later.";

/// Key used when neither a forwarded address nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Tracked clients above which idle buckets are pruned.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Keyed token bucket: `per_minute` calls in a burst, refilled evenly over
/// a minute.
#[derive(Clone)]
pub struct ActivationRateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl ActivationRateLimiter {
    pub fn per_minute(limit: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(limit))),
        }
    }

    /// Take one call from `client`'s budget, or return how long to wait.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        let key = client.to_string();
        let outcome = self
            .limiter
            .check_key(&key)
            .map_err(|not_until| not_until.wait_time_from(self.limiter.clock().now()));

        if self.limiter.len() > MAX_TRACKED_CLIENTS {
            self.limiter.retain_recent();
        }
        outcome
    }
}

/// Address a request is attributed to.
pub fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware rejecting over-budget clients with `429` and `Retry-After`.
pub async fn limit_activations(
    State(limiter): State<ActivationRateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(req.headers(), req.extensions().get());

    if let Err(wait) = limiter.check(&client) {
        tracing::warn!(client = %client, "Activation rate limit exceeded");
        let mut response =
            ApiError::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_DETAIL).into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(wait.as_secs().max(1)),
        );
        return response;
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn budget_is_per_client() {
        let limiter = ActivationRateLimiter::per_minute(limit(2));
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());

        let wait = limiter.check("10.0.0.1").unwrap_err();
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(30));

        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[test]
    fn forwarded_address_wins_over_peer() {
        let peer = ConnectInfo(SocketAddr::from(([192, 168, 1, 9], 40000)));

        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, None), UNKNOWN_CLIENT);
        assert_eq!(client_ip(&headers, Some(&peer)), "192.168.1.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(&peer)), "203.0.113.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_ip(&headers, Some(&peer)), "192.168.1.9");
    }
}
