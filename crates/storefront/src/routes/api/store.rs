//! Store API routes.
//!
//! Exposes the visitor's session store as JSON so page scripts can read it
//! and drive it with the same actions the server dispatches.

use axum::Json;
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::store::{self, Action, StoreState};

/// Current store state.
#[instrument(skip(session))]
pub async fn state(session: Session) -> Result<Json<StoreState>> {
    Ok(Json(store::session::load(&session).await?))
}

/// Apply an action and return the resulting state.
///
/// Unknown action types are rejected with 400 and leave the state untouched.
#[instrument(skip(session, body))]
pub async fn dispatch(session: Session, Json(body): Json<Value>) -> Result<Json<StoreState>> {
    let action = Action::from_json(body).inspect_err(|e| {
        tracing::info!(error = %e, "Rejected store action");
    })?;
    Ok(Json(store::session::dispatch(&session, &action).await?))
}
