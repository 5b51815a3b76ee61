//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Three tiers:
//! - `auth_rate_limiter`: strict limits for login/registration (~10/min)
//! - `api_rate_limiter`: relaxed limits for the authenticated API (~100/min)
//! - `feedback_rate_limiter`: tight limits on the public response form

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that reads the real client IP from proxy headers, falling
/// back through the common ones in trust order.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // CF-Connecting-IP (Cloudflare's real client IP)
        if let Some(ip) = headers
            .get("cf-connecting-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // X-Forwarded-For (first IP in the chain)
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // X-Real-IP
        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // Fly-Client-IP (Fly.io's header)
        if let Some(ip) = headers
            .get("fly-client-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        Err(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// # Panics
///
/// Will not panic; `per_second(6)` and `burst_size(5)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(6) // replenish 1 token every 6 seconds
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for the authenticated API: ~100 requests per minute per IP.
///
/// # Panics
///
/// Will not panic; `per_second(1)` and `burst_size(50)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for the public feedback form: ~6 submissions per minute
/// per IP. The form is unauthenticated so this is the only brake on it.
///
/// # Panics
///
/// Will not panic; `per_second(10)` and `burst_size(3)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn feedback_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(10) // replenish 1 token every 10 seconds
        .burst_size(3)
        .finish()
        .expect("rate limiter config with per_second(10) and burst_size(3) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tower_governor::key_extractor::KeyExtractor;

    fn request_with(header: &str, value: &str) -> Request<()> {
        Request::builder().header(header, value).body(()).unwrap()
    }

    #[test]
    fn test_cloudflare_header_preferred() {
        let req = Request::builder()
            .header("cf-connecting-ip", "203.0.113.9")
            .header("x-forwarded-for", "198.51.100.1")
            .body(())
            .unwrap();
        let key = ProxyIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(key, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let req = request_with("x-forwarded-for", "198.51.100.1, 10.0.0.1");
        let key = ProxyIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(key, "198.51.100.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_headers_fails_extraction() {
        let req = Request::builder().body(()).unwrap();
        assert!(ProxyIpKeyExtractor.extract(&req).is_err());
    }
}
