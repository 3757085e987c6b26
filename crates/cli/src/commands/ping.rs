//! Backend reachability check.

use tracing::info;

use super::{CommandError, backend_client};

/// Call `GET /api/hello` and log the greeting.
///
/// # Errors
///
/// Returns an error if configuration is missing or the backend does not answer.
pub async fn run() -> Result<(), CommandError> {
    let client = backend_client()?;
    let message = client.hello().await?;
    info!(api = %client.api_base(), "Backend answered: {message}");
    Ok(())
}
