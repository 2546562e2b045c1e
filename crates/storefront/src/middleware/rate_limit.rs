//! Rate limiting for the sign-in endpoints, using governor and `tower_governor`.
//!
//! Requests are keyed by client address. `X-Forwarded-For` and `X-Real-IP`
//! are written by whoever sends the request, so they are only read when
//! `BB_TRUST_PROXY_HEADERS` says a reverse proxy in front of us sets them.
//! Even then only the last `X-Forwarded-For` hop is used: that is the one our
//! proxy appended, while anything before it came from the client. Without a
//! trusted proxy the socket peer address is the key.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Seconds to replenish one request (~10/minute).
const AUTH_REPLENISH_SECONDS: u64 = 6;

/// Requests a client may make back to back.
const AUTH_BURST: u32 = 5;

/// Key extractor using the socket peer, or the proxy's client-IP headers
/// when they are trusted.
#[derive(Clone, Copy, Debug)]
pub struct ClientIpKeyExtractor {
    pub trust_proxy_headers: bool,
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(','))
        .last()
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// The client address a request should be limited under.
#[must_use]
pub fn client_ip<T>(req: &Request<T>, trust_proxy_headers: bool) -> IpAddr {
    let headers = req.headers();
    let from_proxy = if trust_proxy_headers {
        forwarded_for(headers).or_else(|| real_ip(headers))
    } else {
        None
    };
    from_proxy
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        // In-process callers have no peer; they share one bucket.
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req, self.trust_proxy_headers))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Returns `None` only if governor rejects the quota, which it does for zero
/// values alone.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor {
            trust_proxy_headers,
        })
        .per_second(AUTH_REPLENISH_SECONDS)
        .burst_size(AUTH_BURST)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn behind_proxy(forwarded: &str) -> Request<Body> {
        let mut req = Request::builder()
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 443))));
        req
    }

    #[test]
    fn test_untrusted_headers_are_ignored() {
        let req = behind_proxy("203.0.113.7");
        assert_eq!(client_ip(&req, false), ip("10.0.0.2"));
    }

    #[test]
    fn test_trusted_proxy_uses_last_hop() {
        let req = behind_proxy("203.0.113.7, 198.51.100.4");
        assert_eq!(client_ip(&req, true), ip("198.51.100.4"));
    }

    #[test]
    fn test_rotating_spoofed_prefix_keeps_one_key() {
        let a = behind_proxy("1.1.1.1, 198.51.100.4");
        let b = behind_proxy("2.2.2.2, 198.51.100.4");
        assert_eq!(client_ip(&a, true), client_ip(&b, true));
    }

    #[test]
    fn test_trusted_proxy_falls_back_to_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req, true), ip("203.0.113.9"));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = Request::new(Body::empty());
        let peer = SocketAddr::from(([192, 0, 2, 10], 4242));
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(client_ip(&req, true), peer.ip());
    }

    #[test]
    fn test_unknown_client_shares_unspecified_bucket() {
        let req = Request::new(Body::empty());
        assert_eq!(client_ip(&req, false), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn test_auth_rate_limiter_builds() {
        assert!(auth_rate_limiter(false).is_some());
        assert!(auth_rate_limiter(true).is_some());
    }
}
