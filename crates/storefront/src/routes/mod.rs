//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page (backend greeting)
//! GET  /health                   - Health check
//! GET  /health/ready             - Backend reachability check
//!
//! # Products
//! GET  /products                 - Product grid
//! GET  /products/{id}            - Product detail
//!
//! # Auth
//! GET  /login                    - Login page
//! POST /login                    - Login action
//! GET  /register                 - Register page
//! POST /register                 - Register action
//! POST /logout                   - Logout action
//!
//! # Account (requires auth)
//! GET  /profile                  - Profile form
//! POST /profile                  - Update profile
//! POST /profile/delete           - Delete account
//!
//! # Favorites (requires auth)
//! GET  /favorites                - Favorites list
//! POST /favorites                - Toggle a favorite
//! POST /favorites/{id}/remove    - Remove a favorite
//!
//! # Shopping cart (requires auth)
//! GET  /shopping-cart            - Cart page
//! POST /shopping-cart/add        - Add a product (or bump its quantity)
//! POST /shopping-cart/update     - Set a line quantity
//! POST /shopping-cart/remove     - Remove a line
//! POST /shopping-cart/checkout   - Redirect to the payment page
//!
//! # Store API (JSON)
//! GET  /api/store                - Session store state
//! POST /api/store/dispatch       - Apply an action
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod favorites;
pub mod home;
pub mod products;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::backend::BackendError;
use crate::middleware::expire_session;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

// =============================================================================
// Page Context
// =============================================================================

/// Data every page layout needs: who is logged in and the pending flash.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user_name: Option<String>,
    pub flash: Option<Flash>,
}

impl Page {
    /// Read the navbar identity and consume the pending flash message.
    pub async fn load(session: &Session) -> Self {
        let user_name = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .map(|user| user.user_name);

        Self {
            user_name,
            flash: Flash::take(session).await,
        }
    }

    /// Whether the navbar shows the account links.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_name.is_some()
    }

    /// Show an error banner on this render. A pending flash takes precedence.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        if self.flash.is_none() {
            self.flash = Some(Flash::error(message));
        }
        self
    }
}

/// Turn a failed backend call from a form action into a redirect.
///
/// A rejected token ends the session; anything else is flashed on the page
/// the visitor is sent back to.
pub async fn backend_failure(session: &Session, err: &BackendError, back_to: &str) -> Response {
    if err.is_unauthorized() {
        return expire_session(session).await;
    }
    tracing::warn!(error = %err, "Backend call failed");
    Flash::error(err.user_message()).set(session).await;
    Redirect::to(back_to).into_response()
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile).post(account::update_profile))
        .route("/delete", post(account::delete_account))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index).post(favorites::toggle))
        .route("/{id}/remove", post(favorites::remove))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the shopping cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create the store API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/store", get(api::store::state))
        .route("/store/dispatch", post(api::store::dispatch))
}

/// Create all routes for the storefront except the rate-limited auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        .route("/logout", post(auth::logout))
        .nest("/products", product_routes())
        .nest("/profile", account_routes())
        .nest("/favorites", favorite_routes())
        .nest("/shopping-cart", cart_routes())
        .nest("/api", api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    use crate::backend::{AccessToken, UserProfile};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_page_for_anonymous_visitor() {
        let page = Page::load(&session()).await;
        assert!(!page.is_authenticated());
        assert!(page.flash.is_none());
    }

    #[tokio::test]
    async fn test_page_reads_user_and_takes_flash() {
        let session = session();
        let profile: UserProfile =
            serde_json::from_str(r#"{"user_id": 1, "user_name": "ana"}"#).unwrap();
        session
            .insert(
                session_keys::CURRENT_USER,
                CurrentUser::new(&profile, AccessToken::new("t")),
            )
            .await
            .unwrap();
        Flash::info("Hola").set(&session).await;

        let page = Page::load(&session).await;
        assert!(page.is_authenticated());
        assert_eq!(page.user_name.as_deref(), Some("ana"));
        assert_eq!(page.flash.unwrap().message, "Hola");

        assert!(Page::load(&session).await.flash.is_none());
    }

    #[test]
    fn test_with_error_keeps_pending_flash() {
        let page = Page {
            user_name: None,
            flash: Some(Flash::success("Saved")),
        }
        .with_error("Boom");
        assert_eq!(page.flash.unwrap().message, "Saved");

        let page = Page::default().with_error("Boom");
        assert_eq!(page.flash.unwrap().message, "Boom");
    }
}
