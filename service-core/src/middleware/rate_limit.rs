use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use serde::Deserialize;
use std::{net::IpAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::error::AppError;

type KeyedLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// Rate limiter keyed by client IP address
#[derive(Clone)]
pub struct IpRateLimiter {
    limiter: Arc<KeyedLimiter>,
    trust_forwarded_for: bool,
}

/// `attempts` allowed per `window_seconds`, as a burst.
///
/// `trust_forwarded_for` keys on `X-Forwarded-For` instead of the socket
/// peer; only enable it behind a proxy that overwrites the header.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitSettings {
    pub attempts: u32,
    pub window_seconds: u64,
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            attempts: 5,
            window_seconds: 60,
            trust_forwarded_for: false,
        }
    }
}

fn quota(attempts: u32, window_seconds: u64) -> Quota {
    let burst = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
    let period = Duration::from_millis((window_seconds.max(1) * 1000) / burst.get() as u64);
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Login attempts are limited per client address.
pub fn create_ip_rate_limiter(settings: RateLimitSettings) -> IpRateLimiter {
    IpRateLimiter {
        limiter: Arc::new(RateLimiter::dashmap(quota(
            settings.attempts,
            settings.window_seconds,
        ))),
        trust_forwarded_for: settings.trust_forwarded_for,
    }
}

/// Client address: the socket peer, or the first `X-Forwarded-For` entry
/// when the header is trusted.
pub fn client_ip(request: &Request, trust_forwarded_for: bool) -> Option<IpAddr> {
    let forwarded = || {
        request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };
    let peer = || {
        request
            .extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|axum::extract::ConnectInfo(addr)| addr.ip())
    };
    if trust_forwarded_for {
        forwarded().or_else(peer)
    } else {
        peer()
    }
}

/// Check one attempt for `ip`, returning the seconds to wait when limited.
pub fn check_ip(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), u64> {
    let Some(ip) = ip else {
        tracing::warn!("Could not determine IP for rate limiting");
        return Ok(());
    };
    limiter.limiter.check_key(&ip).map_err(|negative| {
        negative
            .wait_time_from(DefaultClock::default().now())
            .as_secs()
            .max(1)
    })
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request, limiter.trust_forwarded_for);
    match check_ip(&limiter, ip) {
        Ok(()) => Ok(next.run(request).await),
        Err(wait) => Err(AppError::TooManyRequests(
            "Too many attempts from this address. Please try again later.".to_string(),
            Some(wait),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_limited() {
        let limiter = create_ip_rate_limiter(RateLimitSettings {
            attempts: 2,
            window_seconds: 60,
            ..RateLimitSettings::default()
        });
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(check_ip(&limiter, Some(ip)).is_ok());
        assert!(check_ip(&limiter, Some(ip)).is_ok());
        assert!(check_ip(&limiter, Some(ip)).unwrap_err() >= 1);

        let other: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(check_ip(&limiter, Some(other)).is_ok());
    }

    #[test]
    fn unknown_address_is_not_limited() {
        let limiter = create_ip_rate_limiter(RateLimitSettings {
            attempts: 1,
            window_seconds: 60,
            ..RateLimitSettings::default()
        });
        assert!(check_ip(&limiter, None).is_ok());
        assert!(check_ip(&limiter, None).is_ok());
    }

    #[test]
    fn zero_attempts_still_builds() {
        let limiter = create_ip_rate_limiter(RateLimitSettings {
            attempts: 0,
            window_seconds: 0,
            ..RateLimitSettings::default()
        });
        assert!(check_ip(&limiter, Some("10.0.0.3".parse().unwrap())).is_ok());
    }

    fn login_request(forwarded: &str) -> Request {
        let mut request = axum::http::Request::builder()
            .uri("/login")
            .header("x-forwarded-for", forwarded)
            .body(axum::body::Body::empty())
            .unwrap();
        request.extensions_mut().insert(axum::extract::ConnectInfo(
            "192.0.2.7:40000".parse::<std::net::SocketAddr>().unwrap(),
        ));
        request
    }

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let request = login_request("203.0.113.9, 10.0.0.1");
        assert_eq!(client_ip(&request, false), Some("192.0.2.7".parse().unwrap()));
        assert_eq!(client_ip(&request, true), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn rotating_forwarded_header_does_not_reset_the_limit() {
        let limiter = create_ip_rate_limiter(RateLimitSettings {
            attempts: 1,
            window_seconds: 60,
            ..RateLimitSettings::default()
        });
        let first = login_request("203.0.113.1");
        let second = login_request("203.0.113.2");
        assert!(check_ip(&limiter, client_ip(&first, limiter.trust_forwarded_for)).is_ok());
        assert!(check_ip(&limiter, client_ip(&second, limiter.trust_forwarded_for)).is_err());
    }
}
