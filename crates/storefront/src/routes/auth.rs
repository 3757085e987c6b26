//! Authentication route handlers.
//!
//! Login and registration go through the backend, which hands back a bearer
//! token. The token lives in the server-side session; the browser only holds
//! the session cookie.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{add_breadcrumb, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::routes::Page;
use crate::state::AppState;
use crate::store::{self, Action, Favorite, FavoriteList};
use crate::validation::{FieldErrors, LoginForm, RegisterForm, safe_return_path};

/// Form-level banner for field validation failures.
pub const FIX_FORM_ERRORS: &str = "Please fix the errors in the form";

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub return_to: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub email: String,
    pub return_to: Option<String>,
    pub errors: FieldErrors,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub form: RegisterForm,
    pub errors: FieldErrors,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// Visitors who are already logged in go straight to their profile.
#[instrument(skip(session, user))]
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/profile").into_response();
    }

    LoginTemplate {
        page: Page::load(&session).await,
        email: String::new(),
        return_to: safe_return_path(query.return_to.as_deref()).map(String::from),
        errors: FieldErrors::default(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let return_to = safe_return_path(form.return_to.as_deref()).map(String::from);
    let render = |page: Page, errors: FieldErrors| LoginTemplate {
        page,
        email: form.email.trim().to_string(),
        return_to: return_to.clone(),
        errors,
    };

    let email = match form.validate() {
        Ok(email) => email,
        Err(errors) => {
            let page = Page::load(&session).await.with_error(FIX_FORM_ERRORS);
            return (StatusCode::UNPROCESSABLE_ENTITY, render(page, errors)).into_response();
        }
    };

    let auth = match state.backend().login(&email, &form.password).await {
        Ok(auth) => auth,
        Err(e) => {
            let status = if e.is_rejection() {
                tracing::info!(error = %e, "Login rejected");
                StatusCode::UNAUTHORIZED
            } else {
                tracing::warn!(error = %e, "Login failed");
                e.gateway_status()
            };
            let page = Page::load(&session).await.with_error(e.user_message());
            return (status, render(page, FieldErrors::default())).into_response();
        }
    };

    let user = CurrentUser::new(&auth.user, auth.token);
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!(error = %e, "Failed to store login in session");
        let page = Page::load(&session)
            .await
            .with_error("Error during login session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            render(page, FieldErrors::default()),
        )
            .into_response();
    }

    set_sentry_user(&user.id, Some(&user.email));
    add_breadcrumb("auth", "Logged in", None);
    tracing::info!(user_id = %user.id, "Visitor logged in");

    match state.backend().get_favorites(&user.token).await {
        Ok(products) => {
            let action = Action::SetFavorites(FavoriteList {
                datafavorites: products.iter().map(Favorite::from).collect(),
            });
            store::session::dispatch_logged(&session, &action).await;
        }
        Err(e) => tracing::warn!(error = %e, "Failed to load favorites after login"),
    }

    Redirect::to(return_to.as_deref().unwrap_or("/profile")).into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(session))]
pub async fn register_page(session: Session) -> impl IntoResponse {
    RegisterTemplate {
        page: Page::load(&session).await,
        form: RegisterForm::default(),
        errors: FieldErrors::default(),
    }
}

/// Handle registration form submission.
///
/// The new account is not logged in automatically; the visitor is sent to
/// the login page.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => {
            let page = Page::load(&session).await.with_error(FIX_FORM_ERRORS);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                RegisterTemplate {
                    page,
                    form: form.without_passwords(),
                    errors,
                },
            )
                .into_response();
        }
    };

    match state.backend().register(&registration).await {
        Ok(auth) => {
            tracing::info!(user_id = %auth.user.user_id, "Account created");
            Flash::success("Account created successfully!")
                .set(&session)
                .await;
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "Registration rejected");
            let page = Page::load(&session).await.with_error(e.user_message());
            (
                StatusCode::BAD_REQUEST,
                RegisterTemplate {
                    page,
                    form: form.without_passwords(),
                    errors: FieldErrors::default(),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session on logout");
    }
    Flash::info("You have been logged out.").set(&session).await;
    Redirect::to("/").into_response()
}
