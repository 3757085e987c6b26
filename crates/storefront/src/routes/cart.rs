//! Shopping cart route handlers.
//!
//! The backend owns the cart; every handler works on the logged-in
//! visitor's cart through their bearer token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cafe_origen_core::ProductId;

use crate::backend::{CartAddOutcome, CartItem, CartSummary, CheckoutRequest};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{RequireAuth, expire_session};
use crate::models::Flash;
use crate::routes::{Page, backend_failure};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            image: item.img.clone().filter(|img| !img.is_empty()),
            quantity: item.quantity,
            price: item.price().to_string(),
            line_price: item
                .line_total()
                .map_or_else(String::new, |total| total.to_string()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl From<&CartSummary> for CartView {
    fn from(cart: &CartSummary) -> Self {
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            total: cart.total.to_string(),
            item_count: cart.item_count(),
        }
    }
}

impl CartView {
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&CartSummary::default())
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
}

/// Update cart form data. The quantity is checked by hand so a bad value
/// can be reported on the cart page.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Parse a submitted quantity. Only whole numbers of at least one are accepted.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|q| *q >= 1)
}

/// Display cart page.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    match state.backend().get_cart(&user.token).await {
        Ok(cart) => CartShowTemplate {
            page: Page::load(&session).await,
            cart: CartView::from(&cart),
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => expire_session(&session).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch cart");
            let page = Page::load(&session).await.with_error(e.user_message());
            (
                StatusCode::BAD_GATEWAY,
                CartShowTemplate {
                    page,
                    cart: CartView::empty(),
                },
            )
                .into_response()
        }
    }
}

/// Add a product to the cart, or raise its quantity if already there.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Response {
    match state
        .backend()
        .add_to_cart(&user.token, form.product_id)
        .await
    {
        Ok(outcome) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb("cart", "Added product", Some(&[("product_id", &product_id)]));
            let message = match outcome {
                CartAddOutcome::Added => "Product added to cart.".to_string(),
                CartAddOutcome::Incremented { quantity } => {
                    format!("Quantity updated to {quantity}.")
                }
            };
            Flash::success(message).set(&session).await;
            Redirect::to("/shopping-cart").into_response()
        }
        Err(e) => {
            let back_to = format!("/products/{}", form.product_id);
            backend_failure(&session, &e, &back_to).await
        }
    }
}

/// Set the quantity of a cart line.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let Some(quantity) = parse_quantity(&form.quantity) else {
        Flash::error("Quantity must be a whole number of at least 1.")
            .set(&session)
            .await;
        return Redirect::to("/shopping-cart").into_response();
    };

    match state
        .backend()
        .update_cart_quantity(&user.token, form.product_id, quantity)
        .await
    {
        Ok(_) => {
            Flash::success("Cart updated.").set(&session).await;
            Redirect::to("/shopping-cart").into_response()
        }
        Err(e) => backend_failure(&session, &e, "/shopping-cart").await,
    }
}

/// Remove a line from the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    match state
        .backend()
        .remove_from_cart(&user.token, form.product_id)
        .await
    {
        Ok(_) => {
            Flash::success("Product removed from cart.")
                .set(&session)
                .await;
            Redirect::to("/shopping-cart").into_response()
        }
        Err(e) => backend_failure(&session, &e, "/shopping-cart").await,
    }
}

/// Start checkout and send the visitor to the payment page.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    let cart = match state.backend().get_cart(&user.token).await {
        Ok(cart) => cart,
        Err(e) => return backend_failure(&session, &e, "/shopping-cart").await,
    };

    let Some(request) = CheckoutRequest::from_cart(&cart) else {
        Flash::error("Your cart is empty. Add products before checking out.")
            .set(&session)
            .await;
        return Redirect::to("/shopping-cart").into_response();
    };

    match state
        .backend()
        .create_checkout_session(&user.token, &request)
        .await
    {
        Ok(url) => {
            tracing::info!(
                lines = request.items.len(),
                total = %cart.total,
                "Checkout session created"
            );
            add_breadcrumb("cart", "Checkout started", None);
            Redirect::to(url.as_str()).into_response()
        }
        Err(e) => backend_failure(&session, &e, "/shopping-cart").await,
    }
}
