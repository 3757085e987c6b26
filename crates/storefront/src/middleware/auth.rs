//! Authentication middleware and extractors.
//!
//! A visitor is authenticated when the session holds a [`CurrentUser`]
//! (and with it a backend bearer token). There is no expiry check here: the
//! backend decides, and a 401 from it ends the session via
//! [`expire_session`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::clear_sentry_user;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::store;

/// Extractor that requires a logged-in visitor.
///
/// If the visitor is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.user_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the visitor is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests), remembering where the
    /// visitor was headed.
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(path) => login_redirect(&path).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Login page URL that returns to `path` afterwards.
///
/// Only GET-able pages are worth returning to; form posts fall back to the
/// login default.
fn login_redirect(path: &str) -> Redirect {
    let returnable = ["/profile", "/favorites", "/shopping-cart"].contains(&path);
    if returnable {
        Redirect::to(&format!("/login?return_to={}", urlencoding::encode(path)))
    } else {
        Redirect::to("/login")
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                let path = parts.uri.path();
                if path.starts_with("/api/") {
                    AuthRejection::Unauthorized
                } else {
                    AuthRejection::RedirectToLogin(path.to_string())
                }
            })?;

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the visitor is not logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session ID first so a pre-login session ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// Drops the store state along with the token; the flash survives.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    if let Err(e) = store::session::clear(session).await {
        tracing::warn!(error = %e, "Failed to clear store state");
    }
    clear_sentry_user();
    Ok(())
}

/// End a session the backend no longer accepts and send the visitor to log in.
pub async fn expire_session(session: &Session) -> Response {
    tracing::info!("Backend rejected session token, logging visitor out");
    if let Err(e) = clear_current_user(session).await {
        tracing::error!(error = %e, "Failed to clear expired session");
    }
    Flash::error("Your session has expired. Please log in again.")
        .set(session)
        .await;
    Redirect::to("/login").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    fn location(path: &str) -> String {
        AuthRejection::RedirectToLogin(path.to_string())
            .into_response()
            .headers()
            .get(LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_login_redirect_remembers_page() {
        assert_eq!(location("/shopping-cart"), "/login?return_to=%2Fshopping-cart");
        assert_eq!(location("/profile"), "/login?return_to=%2Fprofile");
    }

    #[test]
    fn test_login_redirect_skips_form_actions() {
        assert_eq!(location("/shopping-cart/add"), "/login");
        assert_eq!(location("/favorites/3/remove"), "/login");
    }

    #[test]
    fn test_api_rejection_is_401() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
