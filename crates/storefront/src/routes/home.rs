//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::routes::Page;
use crate::state::AppState;
use crate::store::{self, Action, Todo};

/// Banner shown when the backend greeting cannot be loaded.
pub const BACKEND_UNREACHABLE: &str = "Could not fetch the message from the backend. \
     Please check if the backend is running and the backend port is public.";

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub message: Option<String>,
    pub backend_error: Option<&'static str>,
    pub todos: Vec<Todo>,
}

/// Display the home page.
///
/// Fetches the backend greeting and records it in the visitor's store.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let page = Page::load(&session).await;

    let (message, backend_error) = match state.backend().hello().await {
        Ok(message) => {
            store::session::dispatch_logged(&session, &Action::SetHello(message.clone())).await;
            (Some(message), None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch backend greeting");
            (None, Some(BACKEND_UNREACHABLE))
        }
    };

    let todos = match store::session::load(&session).await {
        Ok(state) => state.todos,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load store state");
            store::StoreState::default().todos
        }
    };

    HomeTemplate {
        page,
        message,
        backend_error,
        todos,
    }
}
