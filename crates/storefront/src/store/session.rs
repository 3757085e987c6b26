//! Session-backed persistence for the store.
//!
//! Each visitor's state lives under one session key. Dispatch reads it,
//! reduces, and writes the result back; two concurrent requests of the same
//! visitor resolve last-write-wins.

use tower_sessions::Session;

use super::{Action, StoreError, StoreState, reduce};
use crate::models::session_keys;

/// Load the visitor's state, or the initial state for a new session.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session cannot be read.
pub async fn load(session: &Session) -> Result<StoreState, StoreError> {
    Ok(session
        .get::<StoreState>(session_keys::STORE)
        .await?
        .unwrap_or_default())
}

/// Replace the visitor's state.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session cannot be written.
pub async fn save(session: &Session, state: &StoreState) -> Result<(), StoreError> {
    session.insert(session_keys::STORE, state).await?;
    Ok(())
}

/// Apply an action to the visitor's state and persist the result.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session cannot be read or written.
pub async fn dispatch(session: &Session, action: &Action) -> Result<StoreState, StoreError> {
    let state = load(session).await?;
    let next = reduce(&state, action);
    save(session, &next).await?;
    tracing::debug!(action = action.kind(), "Store action applied");
    Ok(next)
}

/// Dispatch where a failure only warrants a log line.
///
/// Page handlers use this after a successful backend call: the page still
/// renders from the backend response even if the store could not be updated.
pub async fn dispatch_logged(session: &Session, action: &Action) -> Option<StoreState> {
    match dispatch(session, action).await {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(action = action.kind(), error = %e, "Failed to update store");
            None
        }
    }
}

/// Drop the visitor's state (logout).
///
/// # Errors
///
/// Returns `StoreError::Session` if the session cannot be written.
pub async fn clear(session: &Session) -> Result<(), StoreError> {
    session.remove::<StoreState>(session_keys::STORE).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_new_session_loads_initial_state() {
        let state = load(&session()).await.unwrap();
        assert_eq!(state, StoreState::default());
    }

    #[tokio::test]
    async fn test_dispatch_persists_between_calls() {
        let session = session();
        dispatch(&session, &Action::SetHello("Hola".to_string()))
            .await
            .unwrap();

        let state = load(&session).await.unwrap();
        assert_eq!(state.message.as_deref(), Some("Hola"));

        clear(&session).await.unwrap();
        assert!(load(&session).await.unwrap().message.is_none());
    }
}
