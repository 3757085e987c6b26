//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use cafe_origen_core::ProductId;

use crate::backend::{BackendError, Product};
use crate::filters;
use crate::routes::Page;
use crate::state::AppState;
use crate::store::{self, Action};

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub kind: String,
    pub price: String,
    pub stock: Option<String>,
    pub image: Option<String>,
    pub link: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            brand: product.brand.clone(),
            kind: product.kind.clone(),
            price: product.unit_price().to_string(),
            stock: product.stock.clone(),
            image: (!product.img.is_empty()).then(|| product.img.clone()),
            link: product.link(),
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: Page,
    pub products: Vec<ProductView>,
    pub favorites: Vec<ProductId>,
}

impl ProductsIndexTemplate {
    /// Whether a card should offer "Remove from favorites".
    #[must_use]
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.favorites.contains(&id)
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: ProductView,
    pub is_favorite: bool,
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub page: Page,
    pub message: String,
}

/// Display product listing page.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Response {
    let page = Page::load(&session).await;

    match state.backend().get_products().await {
        Ok(products) => {
            let favorites = store::session::dispatch_logged(
                &session,
                &Action::SetProducts(products.to_vec()),
            )
            .await
            .map(|s| s.favorites.iter().map(|f| f.uid).collect())
            .unwrap_or_default();

            ProductsIndexTemplate {
                page,
                products: products.iter().map(ProductView::from).collect(),
                favorites,
            }
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch products");
            let status = e.gateway_status();
            let page = page.with_error(e.user_message());
            (
                status,
                ProductsIndexTemplate {
                    page,
                    products: Vec::new(),
                    favorites: Vec::new(),
                },
            )
                .into_response()
        }
    }
}

/// Display product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let page = Page::load(&session).await;
    let id = ProductId::new(id);

    match state.backend().get_product(id).await {
        Ok(product) => {
            let is_favorite = store::session::load(&session)
                .await
                .map(|s| s.is_favorite(id))
                .unwrap_or(false);

            ProductShowTemplate {
                page,
                product: ProductView::from(&product),
                is_favorite,
            }
            .into_response()
        }
        Err(BackendError::NotFound(_)) => not_found(page, "Product not found."),
        Err(e) => {
            tracing::warn!(product_id = %id, error = %e, "Failed to fetch product");
            let message = e.user_message();
            (
                e.gateway_status(),
                NotFoundTemplate {
                    page: page.with_error(message.clone()),
                    message,
                },
            )
                .into_response()
        }
    }
}

/// Render the 404 page.
pub fn not_found(page: Page, message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            page,
            message: message.to_string(),
        },
    )
        .into_response()
}
