//! Account route handlers.
//!
//! All handlers require authentication via the `RequireAuth` extractor.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{RequireAuth, clear_current_user, expire_session};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::routes::{Page, auth::FIX_FORM_ERRORS, backend_failure};
use crate::state::AppState;
use crate::validation::{FieldErrors, ProfileForm};

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: Page,
    pub form: ProfileForm,
    pub errors: FieldErrors,
}

/// Display the profile form, prefilled from the backend.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    match state.backend().get_profile(&user.token).await {
        Ok(profile) => ProfileTemplate {
            page: Page::load(&session).await,
            form: ProfileForm::from_profile(&profile),
            errors: FieldErrors::default(),
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => expire_session(&session).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch profile");
            let page = Page::load(&session).await.with_error(e.user_message());
            (
                StatusCode::BAD_GATEWAY,
                ProfileTemplate {
                    page,
                    form: ProfileForm::default(),
                    errors: FieldErrors::default(),
                },
            )
                .into_response()
        }
    }
}

/// Handle the profile form.
///
/// Nothing is sent to the backend until every field passes validation.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Response {
    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => {
            let page = Page::load(&session).await.with_error(FIX_FORM_ERRORS);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                ProfileTemplate {
                    page,
                    form: form.without_passwords(),
                    errors,
                },
            )
                .into_response();
        }
    };

    match state.backend().update_profile(&user.token, &update).await {
        Ok(updated) => {
            // Keep the navbar name in step with the backend
            let refreshed = updated.user.as_ref().map_or_else(
                || CurrentUser {
                    user_name: update.user_name.clone(),
                    email: update.email.clone(),
                    ..user.clone()
                },
                |profile| CurrentUser::new(profile, user.token.clone()),
            );
            if let Err(e) = session.insert(session_keys::CURRENT_USER, &refreshed).await {
                tracing::warn!(error = %e, "Failed to refresh session user");
            }

            add_breadcrumb("account", "Profile updated", None);
            Flash::success("User data updated successfully")
                .set(&session)
                .await;
            Redirect::to("/profile").into_response()
        }
        Err(e) if e.is_unauthorized() => expire_session(&session).await,
        Err(e) => {
            tracing::warn!(error = %e, "Profile update rejected");
            let page = Page::load(&session).await.with_error(e.user_message());
            (
                StatusCode::BAD_REQUEST,
                ProfileTemplate {
                    page,
                    form: form.without_passwords(),
                    errors: FieldErrors::default(),
                },
            )
                .into_response()
        }
    }
}

/// Delete the account and end the session.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    match state.backend().delete_account(&user.token).await {
        Ok(ack) => {
            tracing::info!("Account deleted");
            if let Err(e) = clear_current_user(&session).await {
                tracing::error!(error = %e, "Failed to clear session after account deletion");
            }
            Flash::success(ack.text().unwrap_or("Your account has been deleted."))
                .set(&session)
                .await;
            Redirect::to("/").into_response()
        }
        Err(e) => backend_failure(&session, &e, "/profile").await,
    }
}
