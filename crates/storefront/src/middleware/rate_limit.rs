//! Rate limiting middleware using governor and `tower_governor`.
//!
//! `auth_rate_limiter` applies strict limits to login and registration
//! (~10/min per client IP) so credentials cannot be brute-forced through the
//! storefront.
//!
//! The client IP is the TCP peer address. `X-Forwarded-For` is only read when
//! the peer is a configured trusted proxy, since any client can write it.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor keyed on the connecting peer.
///
/// When the peer is one of `trusted_proxies`, the `X-Forwarded-For` chain is
/// walked from the right and the first address that is not itself a trusted
/// proxy becomes the key.
#[derive(Clone, Debug, Default)]
pub struct ClientIpKeyExtractor {
    trusted_proxies: Arc<[IpAddr]>,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub fn new(trusted_proxies: &[IpAddr]) -> Self {
        Self {
            trusted_proxies: trusted_proxies.into(),
        }
    }

    fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted_proxies.contains(&ip)
    }

    /// Right-most untrusted hop of an `X-Forwarded-For` value.
    fn forwarded_client(&self, header: &str) -> Option<IpAddr> {
        // An unparseable hop ends the walk; nothing left of it can be believed
        let mut last_trusted = None;
        for hop in header.split(',').rev() {
            let ip = hop.trim().parse::<IpAddr>().ok()?;
            if !self.is_trusted(ip) {
                return Some(ip);
            }
            last_trusted = Some(ip);
        }
        last_trusted
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // Requires `into_make_service_with_connect_info`
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)?;

        if !self.is_trusted(peer) {
            return Ok(peer);
        }

        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|header| self.forwarded_client(header));

        Ok(forwarded.unwrap_or(peer))
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trusted_proxies: &[IpAddr]) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trusted_proxies))
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5) // Allow burst of 5 requests
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;
    use tower_governor::key_extractor::KeyExtractor;

    fn request_from(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/login");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        let addr: SocketAddr = format!("{peer}:50000").parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    fn proxies() -> Vec<IpAddr> {
        vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()]
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_for() {
        let req = request_from("198.51.100.4", Some("203.0.113.7"));
        let ip = ClientIpKeyExtractor::default().extract(&req).unwrap();
        assert_eq!(ip.to_string(), "198.51.100.4");
    }

    #[test]
    fn test_trusted_proxy_takes_rightmost_untrusted_hop() {
        let extractor = ClientIpKeyExtractor::new(&proxies());
        let req = request_from("10.0.0.1", Some("1.2.3.4, 203.0.113.7, 10.0.0.2"));
        let ip = extractor.extract(&req).unwrap();
        assert_eq!(ip.to_string(), "203.0.113.7");
    }

    #[test]
    fn test_trusted_proxy_without_header_uses_peer() {
        let extractor = ClientIpKeyExtractor::new(&proxies());
        let ip = extractor.extract(&request_from("10.0.0.1", None)).unwrap();
        assert_eq!(ip.to_string(), "10.0.0.1");
    }

    #[test]
    fn test_garbage_hop_stops_the_walk() {
        let extractor = ClientIpKeyExtractor::new(&proxies());
        let req = request_from("10.0.0.1", Some("203.0.113.7, not-an-ip"));
        let ip = extractor.extract(&req).unwrap();
        assert_eq!(ip.to_string(), "10.0.0.1");
    }

    #[test]
    fn test_no_connect_info_is_an_error() {
        let req = Request::builder().body(()).unwrap();
        assert!(ClientIpKeyExtractor::default().extract(&req).is_err());
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_for_shares_one_budget() {
        let app = Router::new()
            .route("/login", get(|| async { "login" }))
            .layer(auth_rate_limiter(&[]));

        let mut accepted = 0;
        for i in 0..20 {
            let spoofed = format!("203.0.113.{i}");
            let response = app
                .clone()
                .oneshot(request_from("198.51.100.4", Some(&spoofed)))
                .await
                .unwrap();
            if response.status() == StatusCode::OK {
                accepted += 1;
            } else {
                assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            }
        }

        assert_eq!(accepted, 5);
    }
}
