//! End-to-end tests for the Café de Origen storefront.
//!
//! Each test spawns a [`FakeBackend`] and a storefront wired to it, both on
//! ephemeral ports, and drives the storefront over HTTP with a cookie-aware
//! client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cafe-origen-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod fake_backend;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use cafe_origen_storefront::app;
use cafe_origen_storefront::config::{BackendConfig, SentryConfig, StorefrontConfig};
use cafe_origen_storefront::state::AppState;
use reqwest::{Client, Response, redirect};

pub use fake_backend::{CHECKOUT_URL, CUSTOMER_EMAIL, CUSTOMER_PASSWORD, FakeBackend};

/// A storefront served against a fake backend.
pub struct TestApp {
    pub addr: SocketAddr,
    pub backend: FakeBackend,
    pub client: Client,
}

impl TestApp {
    /// Start a fake backend and a storefront in front of it.
    pub async fn spawn() -> Self {
        let backend = FakeBackend::spawn().await;

        let config = StorefrontConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            auth_rate_limit: false,
            trusted_proxies: Vec::new(),
            session_capacity: StorefrontConfig::DEFAULT_SESSION_CAPACITY,
            backend: BackendConfig::new(&backend.url()).expect("backend config"),
            sentry: SentryConfig::default(),
        };
        let state = AppState::new(config).expect("storefront state");
        let router = app::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront");
        let addr = listener.local_addr().expect("storefront address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("storefront server");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("test client");

        Self {
            addr,
            backend,
            client,
        }
    }

    /// Absolute URL of a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request")
    }

    /// Log in as the seeded customer.
    pub async fn login(&self) -> Response {
        let response = self
            .post_form(
                "/login",
                &[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)],
            )
            .await;
        assert!(
            response.status().is_redirection(),
            "login failed with {}",
            response.status()
        );
        response
    }
}

/// Target of a redirect response.
#[must_use]
pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
