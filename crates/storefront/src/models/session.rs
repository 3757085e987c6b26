//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use cafe_origen_core::UserId;

use crate::backend::{AccessToken, UserProfile};

/// Session-stored user identity.
///
/// Holds the backend bearer token alongside the little the navbar and
/// error reports need. Its presence in the session is what makes a visitor
/// authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub user_name: String,
    /// Email address as the backend reports it.
    pub email: String,
    /// Bearer token for backend calls.
    pub token: AccessToken,
}

impl CurrentUser {
    /// Build the session identity from a login or registration response.
    #[must_use]
    pub fn new(user: &UserProfile, token: AccessToken) -> Self {
        Self {
            id: user.user_id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            token,
        }
    }
}

/// Session keys for storefront data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the visitor's store state.
    pub const STORE: &str = "store";

    /// Key for the one-shot flash message.
    pub const FLASH: &str = "flash";
}
