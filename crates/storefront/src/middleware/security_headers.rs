//! Security headers applied to every storefront response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Content Security Policy.
///
/// Product images live on arbitrary HTTPS hosts and checkout posts leave for
/// the payment processor, so `img-src` and `form-action` admit `https:`.
/// Scripts and styles are same-origin only; page scripts never use inline
/// code or inline styles.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     script-src 'self'; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' https: data:; \
     connect-src 'self'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self' https:; \
     frame-ancestors 'none'";

/// Browser features the storefront never needs.
const PERMISSIONS_POLICY: &str = "camera=(), \
     microphone=(), \
     geolocation=(), \
     payment=(), \
     usb=(), \
     interest-cohort=(), \
     browsing-topics=()";

/// `(header, value)` pairs set on each response.
const HEADERS: [(&str, &str); 8] = [
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("permissions-policy", PERMISSIONS_POLICY),
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "same-origin"),
    // Pages carry the visitor's name, cart and flash messages
    ("cache-control", "no-store, max-age=0"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
];

/// Add the security headers to a response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}
