//! Backend REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP with a per-request timeout.
//! Caches product list and detail responses using `moka` (5-minute TTL).

use std::sync::Arc;

use cafe_origen_core::ProductId;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::BackendError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    AccessToken, ApiMessage, AuthResponse, CartAddOutcome, CartResponse, CartSummary,
    CheckoutRequest, CheckoutResponse, FavoriteToggle, FavoritesResponse, HelloResponse,
    NewProduct, OneOrMany, Product, ProductCreated, ProfileUpdate, ProfileUpdated, Registration,
    UserProfile,
};
use crate::config::BackendConfig;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the shop backend REST API.
///
/// Cheap to clone; clones share the connection pool and the product cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    /// `{BACKEND_URL}/api/`
    api_base: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the base URL
    /// cannot be extended with `api/`.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cafe-origen-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let api_base = config
            .base_url
            .join("api/")
            .map_err(|e| BackendError::Parse(format!("invalid backend URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                api_base,
                cache,
            }),
        })
    }

    /// The resolved `/api/` base URL.
    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.inner.api_base
    }

    /// Build a request for an API path, attaching the bearer token if given.
    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> Result<RequestBuilder, BackendError> {
        let url = self
            .inner
            .api_base
            .join(path.trim_start_matches('/'))
            .map_err(|e| BackendError::Parse(format!("invalid API path {path}: {e}")))?;

        let builder = self.inner.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Send a request and return the body of a success response.
    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::from_response(status, &body));
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e.to_string())
        })
    }

    /// Send a request whose body is only an acknowledgement.
    ///
    /// An empty or unexpected body still counts as success.
    async fn execute_message(&self, request: RequestBuilder) -> Result<ApiMessage, BackendError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
        body: &B,
    ) -> Result<RequestBuilder, BackendError> {
        Ok(self.request(method, path, token)?.json(body))
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Fetch the backend greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or answers non-2xx.
    #[instrument(skip(self))]
    pub async fn hello(&self) -> Result<String, BackendError> {
        let request = self.request(Method::GET, "hello", None)?;
        let hello: HelloResponse = self.execute(request).await?;
        Ok(hello.message)
    }

    // =========================================================================
    // Auth & Profile Methods
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the backend's message on rejected credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let request = self.json_request(Method::POST, "login", None, &body)?;
        self.execute(request).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the account cannot be created.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, BackendError> {
        let request = self.json_request(Method::POST, "register", None, registration)?;
        self.execute(request).await
    }

    /// Fetch the current user's profile.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the token was rejected.
    #[instrument(skip(self, token))]
    pub async fn get_profile(&self, token: &AccessToken) -> Result<UserProfile, BackendError> {
        let request = self.request(Method::GET, "user", Some(token))?;
        self.execute(request).await
    }

    /// Update the current user's profile.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the update is rejected.
    #[instrument(skip(self, token, update))]
    pub async fn update_profile(
        &self,
        token: &AccessToken,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdated, BackendError> {
        let request = self.json_request(Method::PUT, "user", Some(token), update)?;
        self.execute(request).await
    }

    /// Delete the current user's account.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the deletion is rejected.
    #[instrument(skip(self, token))]
    pub async fn delete_account(&self, token: &AccessToken) -> Result<ApiMessage, BackendError> {
        let request = self.request(Method::DELETE, "user", Some(token))?;
        self.execute_message(request).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = self.request(Method::GET, "products", None)?;
        let products: Arc<Vec<Product>> = Arc::new(self.execute(request).await?);

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.request(Method::GET, &format!("products/{id}"), None)?;
        let response: OneOrMany<Product> = self.execute(request).await?;
        let product = response
            .into_first()
            .ok_or_else(|| BackendError::NotFound("Product not found.".to_string()))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Create a product. Clears the product cache on success.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the product is rejected.
    #[instrument(skip(self, token, product), fields(name = %product.name))]
    pub async fn create_product(
        &self,
        token: &AccessToken,
        product: &NewProduct,
    ) -> Result<ProductCreated, BackendError> {
        let request = self.json_request(Method::POST, "products", Some(token), product)?;
        let created = self.execute(request).await?;
        self.inner.cache.invalidate_all();
        Ok(created)
    }

    // =========================================================================
    // Favorite Methods
    // =========================================================================

    /// List the current user's favorite products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_favorites(&self, token: &AccessToken) -> Result<Vec<Product>, BackendError> {
        let request = self.request(Method::GET, "favorites", Some(token))?;
        let response: FavoritesResponse = self.execute(request).await?;
        Ok(response.favorite_products)
    }

    /// Toggle a product in the favorites list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the body is not a
    /// toggle response.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn toggle_favorite(
        &self,
        token: &AccessToken,
        id: ProductId,
    ) -> Result<FavoriteToggle, BackendError> {
        let body = serde_json::json!({ "product_id": id });
        let request = self.json_request(Method::POST, "favorites", Some(token), &body)?;
        self.execute(request).await
    }

    /// Remove a product from the favorites list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn remove_favorite(
        &self,
        token: &AccessToken,
        id: ProductId,
    ) -> Result<ApiMessage, BackendError> {
        let request = self.request(Method::DELETE, &format!("favorites/{id}"), Some(token))?;
        self.execute_message(request).await
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the current user's cart. A 404 means the cart is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails for any other reason, or
    /// if the cart total overflows.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &AccessToken) -> Result<CartSummary, BackendError> {
        let request = self.request(Method::GET, "shopping-cart", Some(token))?;
        match self.execute::<CartResponse>(request).await {
            Ok(response) => CartSummary::new(response.shopping_cart_products)
                .ok_or_else(|| BackendError::Parse("cart total overflows".to_string())),
            Err(BackendError::NotFound(_)) => {
                debug!("Cart not found, treating as empty");
                Ok(CartSummary::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Add a product to the cart.
    ///
    /// `POST /shopping-cart` removes a product that is already present, so
    /// the cart is read first and existing lines get their quantity raised.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the API requests fail.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn add_to_cart(
        &self,
        token: &AccessToken,
        id: ProductId,
    ) -> Result<CartAddOutcome, BackendError> {
        let cart = self.get_cart(token).await?;

        if let Some(existing) = cart.find(id) {
            let quantity = existing.quantity.saturating_add(1);
            self.update_cart_quantity(token, id, quantity).await?;
            return Ok(CartAddOutcome::Incremented { quantity });
        }

        let body = serde_json::json!({ "product_id": id });
        let request = self.json_request(Method::POST, "shopping-cart", Some(token), &body)?;
        self.execute_message(request).await?;
        Ok(CartAddOutcome::Added)
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the update is rejected.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn update_cart_quantity(
        &self,
        token: &AccessToken,
        id: ProductId,
        quantity: u32,
    ) -> Result<ApiMessage, BackendError> {
        let body = serde_json::json!({ "quantity": quantity });
        let request =
            self.json_request(Method::PUT, &format!("shopping-cart/{id}"), Some(token), &body)?;
        self.execute_message(request).await
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn remove_from_cart(
        &self,
        token: &AccessToken,
        id: ProductId,
    ) -> Result<ApiMessage, BackendError> {
        let request = self.request(Method::DELETE, &format!("shopping-cart/{id}"), Some(token))?;
        self.execute_message(request).await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Create a payment checkout session and return its URL.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Parse` if the backend answers without a valid
    /// http(s) `checkout_url`.
    #[instrument(skip(self, token, checkout), fields(lines = checkout.items.len()))]
    pub async fn create_checkout_session(
        &self,
        token: &AccessToken,
        checkout: &CheckoutRequest,
    ) -> Result<Url, BackendError> {
        let request =
            self.json_request(Method::POST, "create-checkout-session", Some(token), checkout)?;
        let response: CheckoutResponse = self.execute(request).await?;

        let raw = response
            .checkout_url
            .ok_or_else(|| BackendError::Parse("missing checkout_url".to_string()))?;
        parse_checkout_url(&raw)
    }
}

/// Accept only absolute http(s) URLs as redirect targets.
fn parse_checkout_url(raw: &str) -> Result<Url, BackendError> {
    let url =
        Url::parse(raw).map_err(|e| BackendError::Parse(format!("invalid checkout_url: {e}")))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(BackendError::Parse(format!(
            "checkout_url has unsupported scheme '{}'",
            url.scheme()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn test_api_base_keeps_path_prefix() {
        assert_eq!(
            client("http://localhost:3001").api_base().as_str(),
            "http://localhost:3001/api/"
        );
        assert_eq!(
            client("https://example.com/shop/").api_base().as_str(),
            "https://example.com/shop/api/"
        );
    }

    #[test]
    fn test_request_urls() {
        let client = client("http://localhost:3001");
        let request = client
            .request(Method::GET, "/products/4", None)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:3001/api/products/4");
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_request_attaches_bearer_token() {
        let client = client("http://localhost:3001");
        let token = AccessToken::new("abc");
        let request = client
            .request(Method::GET, "user", Some(&token))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer abc");
    }

    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_toggle_favorite_rejects_unreadable_body() {
        let router = axum::Router::new().route(
            "/api/favorites",
            axum::routing::post(|| async { "<html>maintenance</html>" }),
        );
        let client = client(&serve(router).await);

        let result = client
            .toggle_favorite(&AccessToken::new("t"), ProductId::new(1))
            .await;
        assert!(matches!(result, Err(BackendError::Parse(_))));
    }

    #[tokio::test]
    async fn test_get_cart_rejects_overflowing_total() {
        let router = axum::Router::new().route(
            "/api/shopping-cart",
            axum::routing::get(|| async {
                r#"{"shopping_cart_products": [
                    {"product_id": 1, "product_price": "50000000000000000000000000000", "quantity": 3}
                ]}"#
            }),
        );
        let client = client(&serve(router).await);

        let result = client.get_cart(&AccessToken::new("t")).await;
        assert!(matches!(result, Err(BackendError::Parse(_))));
    }

    #[test]
    fn test_parse_checkout_url() {
        assert!(parse_checkout_url("https://checkout.stripe.com/c/pay/cs_test_1").is_ok());
        assert!(parse_checkout_url("javascript:alert(1)").is_err());
        assert!(parse_checkout_url("/relative").is_err());
    }
}
