//! CLI command implementations.

pub mod ping;
pub mod seed;

use cafe_origen_storefront::backend::{BackendClient, BackendError};
use cafe_origen_storefront::config::{BackendConfig, ConfigError};
use thiserror::Error;

pub use seed::SeedError;

/// Errors surfaced by any command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", .0.user_message())]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Build a backend client from the `BACKEND_*` environment variables.
fn backend_client() -> Result<BackendClient, CommandError> {
    let config = BackendConfig::from_env()?;
    tracing::debug!(backend = %config.base_url, "Using backend");
    Ok(BackendClient::new(&config)?)
}
