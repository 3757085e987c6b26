//! In-process stand-in for the shop's REST backend.
//!
//! Mirrors the backend's observable behavior, quirks included: favorites and
//! cart POSTs toggle, product detail answers with a one-element array, and
//! an empty cart is a 404.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Password of the seeded customer.
pub const CUSTOMER_PASSWORD: &str = "cafecito1";
/// Email of the seeded customer.
pub const CUSTOMER_EMAIL: &str = "ana@example.com";
/// Checkout URL handed out by the fake payment integration.
pub const CHECKOUT_URL: &str = "https://checkout.payments.test/c/pay/cs_test_123";

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

impl User {
    fn token(&self) -> String {
        format!("token-{}", self.id)
    }

    fn to_json(&self) -> Value {
        json!({
            "user_id": self.id,
            "user_name": self.user_name,
            "email": self.email,
            "is_active": true,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "phone": self.phone,
            "address": self.address,
        })
    }
}

/// Mutable backend data, inspectable from tests.
#[derive(Debug, Default)]
pub struct BackendData {
    pub users: Vec<User>,
    pub products: Vec<Value>,
    /// Favorite product IDs of the seeded customer.
    pub favorites: Vec<i32>,
    /// `(product_id, quantity)` lines of the seeded customer's cart.
    pub cart: Vec<(i32, u32)>,
    pub cart_posts: usize,
    pub cart_puts: Vec<(i32, u32)>,
    pub checkout_requests: Vec<Value>,
    pub profile_updates: Vec<Value>,
    pub registrations: Vec<Value>,
    pub product_fetches: usize,
    /// When set, every authenticated call answers 401.
    pub tokens_revoked: bool,
    /// When set, `/api/hello` answers 500.
    pub hello_fails: bool,
    /// When set, `GET /api/products` answers 500.
    pub products_fail: bool,
    /// When set, `POST /api/login` answers 500.
    pub login_fails: bool,
}

impl BackendData {
    fn seeded() -> Self {
        Self {
            users: vec![User {
                id: 1,
                email: CUSTOMER_EMAIL.to_string(),
                password: CUSTOMER_PASSWORD.to_string(),
                user_name: "ana".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Ruiz".to_string(),
                phone: "+34-600-12-34-56".to_string(),
                address: "Calle Mayor 1, Madrid".to_string(),
            }],
            products: vec![
                json!({"id": 1, "name": "Etiopía Yirgacheffe", "description": "Floral and bright",
                       "img": "https://img.test/etiopia.jpg", "brand": "Café de Origen",
                       "type": "Whole bean", "price": 14.5, "stock": "12"}),
                json!({"id": 2, "name": "Colombia Huila", "description": "Panela and cocoa",
                       "img": null, "brand": "Café de Origen", "type": "Ground",
                       "price": 12.25, "stock": 3}),
                json!({"id": 3, "name": "Moka pot", "description": null, "img": "",
                       "brand": "Bialetti", "type": "Accessory", "price": 34.0}),
            ],
            ..Self::default()
        }
    }

    fn product(&self, id: i32) -> Option<&Value> {
        self.products
            .iter()
            .find(|p| p.get("id").and_then(Value::as_i64) == Some(i64::from(id)))
    }
}

type Shared = Arc<Mutex<BackendData>>;

/// A running fake backend.
pub struct FakeBackend {
    addr: SocketAddr,
    data: Shared,
}

impl FakeBackend {
    /// Start the fake backend on an ephemeral port.
    pub async fn spawn() -> Self {
        let data: Shared = Arc::new(Mutex::new(BackendData::seeded()));

        let app = Router::new()
            .route("/api/hello", get(hello))
            .route("/api/login", post(login))
            .route("/api/register", post(register))
            .route(
                "/api/user",
                get(get_user).put(update_user).delete(delete_user),
            )
            .route("/api/products", get(list_products).post(create_product))
            .route("/api/products/{id}", get(get_product))
            .route("/api/favorites", get(list_favorites).post(toggle_favorite))
            .route("/api/favorites/{id}", delete(remove_favorite))
            .route("/api/shopping-cart", get(get_cart).post(toggle_cart))
            .route(
                "/api/shopping-cart/{id}",
                put(update_cart).delete(remove_cart),
            )
            .route("/api/create-checkout-session", post(checkout))
            .with_state(Arc::clone(&data));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend server");
        });

        Self { addr, data }
    }

    /// Base URL to configure the storefront with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Lock the backend data for inspection or setup.
    pub fn data(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().expect("fake backend data lock")
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn lock(data: &Shared) -> MutexGuard<'_, BackendData> {
    data.lock().expect("fake backend data lock")
}

fn msg(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "msg": text }))).into_response()
}

/// Resolve the bearer token to the user it belongs to.
fn authenticate(data: &BackendData, headers: &HeaderMap) -> Result<User, Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| msg(StatusCode::UNAUTHORIZED, "Missing Authorization Header"))?;

    if data.tokens_revoked {
        return Err(msg(StatusCode::UNAUTHORIZED, "Token has expired"));
    }

    data.users
        .iter()
        .find(|u| u.token() == token)
        .cloned()
        .ok_or_else(|| msg(StatusCode::UNAUTHORIZED, "Token has expired"))
}

fn cart_json(data: &BackendData) -> Vec<Value> {
    data.cart
        .iter()
        .filter_map(|(id, quantity)| {
            data.product(*id).map(|p| {
                json!({
                    "product_id": id,
                    "product_name": p["name"],
                    "product_price": p["price"],
                    "quantity": quantity,
                    "img": p["img"],
                })
            })
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

async fn hello(State(data): State<Shared>) -> Response {
    if lock(&data).hello_fails {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(json!({
        "message": "Hello! I'm a message that came from the backend"
    }))
    .into_response()
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(data): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let data = lock(&data);
    if data.login_fails {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let Some(user) = data.users.iter().find(|u| u.email == body.email) else {
        return msg(StatusCode::NOT_FOUND, "User not found");
    };
    if user.password != body.password {
        return msg(StatusCode::BAD_REQUEST, "Incorrect password");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "msg": "Login successful",
            "token": user.token(),
            "user": user.to_json(),
        })),
    )
        .into_response()
}

async fn register(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = lock(&data);
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if data.users.iter().any(|u| u.email == email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "User already exists" })),
        )
            .into_response();
    }

    let field = |name: &str| body[name].as_str().unwrap_or_default().to_string();
    let user = User {
        id: i32::try_from(data.users.len()).unwrap_or(i32::MAX) + 1,
        email,
        password: field("password"),
        user_name: field("user_name"),
        first_name: field("first_name"),
        last_name: field("last_name"),
        phone: field("phone"),
        address: field("address"),
    };
    data.registrations.push(body);
    let response = json!({
        "msg": "User created successfully",
        "token": user.token(),
        "user": user.to_json(),
    });
    data.users.push(user);
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn get_user(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let data = lock(&data);
    match authenticate(&data, &headers) {
        Ok(user) => Json(user.to_json()).into_response(),
        Err(rejection) => rejection,
    }
}

async fn update_user(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    let user = match authenticate(&data, &headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };

    data.profile_updates.push(body.clone());
    let Some(stored) = data.users.iter_mut().find(|u| u.id == user.id) else {
        return msg(StatusCode::NOT_FOUND, "User not found");
    };
    let text = |name: &str, current: &str| {
        body[name]
            .as_str()
            .map_or_else(|| current.to_string(), String::from)
    };
    stored.email = text("email", &stored.email);
    stored.user_name = text("user_name", &stored.user_name);
    stored.first_name = text("first_name", &stored.first_name);
    stored.last_name = text("last_name", &stored.last_name);
    stored.phone = text("phone", &stored.phone);
    stored.address = text("address", &stored.address);
    if let Some(password) = body["password"].as_str() {
        stored.password = password.to_string();
    }

    Json(json!({ "msg": "User updated", "user": stored.to_json() })).into_response()
}

async fn delete_user(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let mut data = lock(&data);
    match authenticate(&data, &headers) {
        Ok(user) => {
            data.users.retain(|u| u.id != user.id);
            msg(StatusCode::OK, "User deleted")
        }
        Err(rejection) => rejection,
    }
}

async fn list_products(State(data): State<Shared>) -> Response {
    let mut data = lock(&data);
    data.product_fetches += 1;
    if data.products_fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(Value::Array(data.products.clone())).into_response()
}

async fn get_product(State(data): State<Shared>, Path(id): Path<i32>) -> Response {
    let data = lock(&data);
    match data.product(id) {
        Some(product) => Json(json!([product])).into_response(),
        None => msg(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn create_product(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    if body["name"].as_str().is_none_or(str::is_empty) {
        return msg(StatusCode::BAD_REQUEST, "Fill all data");
    }
    body["id"] = json!(data.products.len() + 1);
    data.products.push(body.clone());
    Json(json!({ "msg": "product created successfully", "product": body })).into_response()
}

async fn list_favorites(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    let products: Vec<Value> = data
        .favorites
        .iter()
        .filter_map(|id| data.product(*id).cloned())
        .collect();
    Json(json!({ "favorite_products": products })).into_response()
}

#[derive(Deserialize)]
struct ProductRef {
    product_id: i32,
}

async fn toggle_favorite(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ProductRef>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    if data.favorites.contains(&body.product_id) {
        data.favorites.retain(|id| *id != body.product_id);
        return msg(StatusCode::OK, "Product deleted");
    }
    data.favorites.push(body.product_id);
    (
        StatusCode::CREATED,
        Json(json!({ "msg": "Favorite created", "updated_favorite": data.favorites })),
    )
        .into_response()
}

async fn remove_favorite(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    data.favorites.retain(|fav| *fav != id);
    msg(StatusCode::OK, "Favorite deleted")
}

async fn get_cart(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    if data.cart.is_empty() {
        return msg(StatusCode::NOT_FOUND, "Cart is empty");
    }
    Json(json!({ "shopping_cart_products": cart_json(&data) })).into_response()
}

async fn toggle_cart(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ProductRef>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    data.cart_posts += 1;
    if data.cart.iter().any(|(id, _)| *id == body.product_id) {
        data.cart.retain(|(id, _)| *id != body.product_id);
        return msg(StatusCode::OK, "Product removed from cart");
    }
    data.cart.push((body.product_id, 1));
    let updated = cart_json(&data);
    (
        StatusCode::CREATED,
        Json(json!({ "msg": "Product added", "updatedCart": updated })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: u32,
}

async fn update_cart(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<QuantityBody>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    if body.quantity > 10 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Not enough stock" })),
        )
            .into_response();
    }
    data.cart_puts.push((id, body.quantity));
    match data.cart.iter_mut().find(|(pid, _)| *pid == id) {
        Some(line) => {
            line.1 = body.quantity;
            msg(StatusCode::OK, "Quantity updated")
        }
        None => msg(StatusCode::NOT_FOUND, "Product not in cart"),
    }
}

async fn remove_cart(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    data.cart.retain(|(pid, _)| *pid != id);
    msg(StatusCode::OK, "Product removed from cart")
}

async fn checkout(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    if let Err(rejection) = authenticate(&data, &headers) {
        return rejection;
    }
    data.checkout_requests.push(body);
    Json(json!({ "checkout_url": CHECKOUT_URL })).into_response()
}
