//! Favorites route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cafe_origen_core::ProductId;

use crate::filters;
use crate::middleware::{RequireAuth, expire_session};
use crate::models::Flash;
use crate::routes::products::ProductView;
use crate::routes::{Page, backend_failure};
use crate::state::AppState;
use crate::store::{self, Action, Favorite, FavoriteList, FavoriteRef};
use crate::validation::safe_return_path;

/// Toggle favorite form data.
#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteForm {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub return_to: Option<String>,
}

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites/index.html")]
pub struct FavoritesTemplate {
    pub page: Page,
    pub products: Vec<ProductView>,
}

/// Display the visitor's favorites.
///
/// The list comes from the backend and also refreshes the session store.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    match state.backend().get_favorites(&user.token).await {
        Ok(products) => {
            let action = Action::SetFavorites(FavoriteList {
                datafavorites: products.iter().map(Favorite::from).collect(),
            });
            store::session::dispatch_logged(&session, &action).await;

            FavoritesTemplate {
                page: Page::load(&session).await,
                products: products.iter().map(ProductView::from).collect(),
            }
            .into_response()
        }
        Err(e) if e.is_unauthorized() => expire_session(&session).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch favorites");
            let page = Page::load(&session).await.with_error(e.user_message());
            (
                StatusCode::BAD_GATEWAY,
                FavoritesTemplate {
                    page,
                    products: Vec::new(),
                },
            )
                .into_response()
        }
    }
}

/// Add a product to favorites, or remove it if it already is one.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ToggleFavoriteForm>,
) -> Response {
    let back_to = safe_return_path(form.return_to.as_deref())
        .unwrap_or("/favorites")
        .to_string();

    match state
        .backend()
        .toggle_favorite(&user.token, form.product_id)
        .await
    {
        Ok(outcome) => {
            let action = if outcome.added() {
                let name = form.name.clone().unwrap_or_default();
                Action::AddToFavorites(Favorite {
                    uid: form.product_id,
                    name,
                    linkto: format!("/products/{}", form.product_id),
                })
            } else {
                Action::RemoveFromFavorites(FavoriteRef {
                    uid: form.product_id,
                })
            };
            store::session::dispatch_logged(&session, &action).await;

            let message = if outcome.added() {
                "Added to favorites."
            } else {
                "Removed from favorites."
            };
            Flash::success(message).set(&session).await;
            Redirect::to(&back_to).into_response()
        }
        Err(e) => backend_failure(&session, &e, &back_to).await,
    }
}

/// Remove a product from favorites.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Response {
    let id = ProductId::new(id);

    match state.backend().remove_favorite(&user.token, id).await {
        Ok(_) => {
            store::session::dispatch_logged(
                &session,
                &Action::RemoveFromFavorites(FavoriteRef { uid: id }),
            )
            .await;
            Flash::success("Removed from favorites.").set(&session).await;
            Redirect::to("/favorites").into_response()
        }
        Err(e) => backend_failure(&session, &e, "/favorites").await,
    }
}
