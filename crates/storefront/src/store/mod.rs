//! Per-visitor UI state container.
//!
//! A [`StoreState`] holds the greeting message, the demo todo list, the
//! visitor's favorites and the last product list. It only changes through
//! [`reduce`], a pure function of the previous state and an [`Action`].
//! Page handlers dispatch actions after backend calls; page scripts can read
//! and drive the same state as JSON through `/api/store`.
//!
//! Actions use the `{ "type": ..., "payload": ... }` shape:
//!
//! ```
//! use cafe_origen_storefront::store::{Action, StoreState, reduce};
//!
//! let action = Action::from_json(serde_json::json!({
//!     "type": "set_hello",
//!     "payload": "Hola",
//! }))
//! .unwrap();
//!
//! let state = reduce(&StoreState::default(), &action);
//! assert_eq!(state.message.as_deref(), Some("Hola"));
//! ```

pub mod session;

use cafe_origen_core::ProductId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::backend::Product;

/// Errors raised while applying actions.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The action's `type` is not one the reducer knows.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The action type is known but its payload has the wrong shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The session backing the store could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Entry of the demo todo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u32,
    pub title: String,
    pub background: Option<String>,
}

/// A favorite product as kept in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub uid: ProductId,
    pub name: String,
    #[serde(alias = "linkTo")]
    pub linkto: String,
}

impl From<&Product> for Favorite {
    fn from(product: &Product) -> Self {
        Self {
            uid: product.id,
            name: product.name.clone(),
            linkto: product.link(),
        }
    }
}

/// UI state for one visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    pub message: Option<String>,
    pub todos: Vec<Todo>,
    pub favorites: Vec<Favorite>,
    pub products: Vec<Product>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            message: None,
            todos: vec![
                Todo {
                    id: 1,
                    title: "Make the bed".to_string(),
                    background: None,
                },
                Todo {
                    id: 2,
                    title: "Do my homework".to_string(),
                    background: None,
                },
            ],
            favorites: Vec::new(),
            products: Vec::new(),
        }
    }
}

impl StoreState {
    /// Whether a product is among the favorites.
    #[must_use]
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.favorites.iter().any(|f| f.uid == id)
    }
}

/// Payload of `add_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskColor {
    pub id: u32,
    pub color: String,
}

/// Payload of `SET_FAVORITES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteList {
    pub datafavorites: Vec<Favorite>,
}

/// Payload of `REMOVE_FROM_FAVORITES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRef {
    pub uid: ProductId,
}

/// A state transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Action {
    #[serde(rename = "set_hello")]
    SetHello(String),
    #[serde(rename = "add_task")]
    AddTask(TaskColor),
    #[serde(rename = "SET_PRODUCTS")]
    SetProducts(Vec<Product>),
    #[serde(rename = "SET_FAVORITES")]
    SetFavorites(FavoriteList),
    #[serde(rename = "ADD_TO_FAVORITES")]
    AddToFavorites(Favorite),
    #[serde(rename = "REMOVE_FROM_FAVORITES")]
    RemoveFromFavorites(FavoriteRef),
}

impl Action {
    /// Every action type the reducer accepts.
    pub const KNOWN_TYPES: [&'static str; 6] = [
        "set_hello",
        "add_task",
        "SET_PRODUCTS",
        "SET_FAVORITES",
        "ADD_TO_FAVORITES",
        "REMOVE_FROM_FAVORITES",
    ];

    /// Parse an action from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownAction` when `type` is missing or not a
    /// known action, and `StoreError::InvalidPayload` when the payload does
    /// not match the action.
    pub fn from_json(value: Value) -> Result<Self, StoreError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::UnknownAction(String::new()))?;

        if !Self::KNOWN_TYPES.contains(&kind) {
            return Err(StoreError::UnknownAction(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| StoreError::InvalidPayload(e.to_string()))
    }

    /// The wire name of this action.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetHello(_) => "set_hello",
            Self::AddTask(_) => "add_task",
            Self::SetProducts(_) => "SET_PRODUCTS",
            Self::SetFavorites(_) => "SET_FAVORITES",
            Self::AddToFavorites(_) => "ADD_TO_FAVORITES",
            Self::RemoveFromFavorites(_) => "REMOVE_FROM_FAVORITES",
        }
    }
}

/// Apply an action, returning the next state.
///
/// The previous state is left untouched; only the field the action targets
/// differs in the result.
#[must_use]
pub fn reduce(state: &StoreState, action: &Action) -> StoreState {
    match action {
        Action::SetHello(message) => StoreState {
            message: Some(message.clone()),
            ..state.clone()
        },
        Action::AddTask(TaskColor { id, color }) => StoreState {
            todos: state
                .todos
                .iter()
                .map(|todo| {
                    if todo.id == *id {
                        Todo {
                            background: Some(color.clone()),
                            ..todo.clone()
                        }
                    } else {
                        todo.clone()
                    }
                })
                .collect(),
            ..state.clone()
        },
        Action::SetProducts(products) => StoreState {
            products: products.clone(),
            ..state.clone()
        },
        Action::SetFavorites(FavoriteList { datafavorites }) => StoreState {
            favorites: datafavorites.clone(),
            ..state.clone()
        },
        Action::AddToFavorites(favorite) => {
            let mut favorites = state.favorites.clone();
            favorites.push(favorite.clone());
            StoreState {
                favorites,
                ..state.clone()
            }
        }
        Action::RemoveFromFavorites(FavoriteRef { uid }) => StoreState {
            favorites: state
                .favorites
                .iter()
                .filter(|f| f.uid != *uid)
                .cloned()
                .collect(),
            ..state.clone()
        },
    }
}
