//! Seed the backend catalogue from a JSON file.
//!
//! The file holds an array of products (`name`, `description`, `img`,
//! `brand`, `type`, `price`). Products are created one by one through the
//! backend API with an operator account, so the backend applies its own
//! validation to each of them.

use std::path::{Path, PathBuf};

use cafe_origen_storefront::backend::{AccessToken, BackendClient, NewProduct};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{error, info, warn};

use super::{CommandError, backend_client};

/// Seeding failures.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{0} not set")]
    MissingEnvVar(&'static str),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid products file: {0}")]
    InvalidFile(#[from] serde_json::Error),

    #[error("{failed} of {total} products could not be created")]
    Incomplete { failed: usize, total: usize },
}

/// Outcome of a seeding run.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub created: usize,
    pub failed: Vec<(String, String)>,
}

impl SeedSummary {
    /// Fail unless every product was created.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Incomplete`] if any product was rejected.
    pub fn check(&self, total: usize) -> Result<(), SeedError> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(SeedError::Incomplete {
                failed: self.failed.len(),
                total,
            })
        }
    }
}

/// Parse a products file.
///
/// # Errors
///
/// Returns an error if the content is not a JSON array of products.
pub fn parse_products(content: &str) -> Result<Vec<NewProduct>, SeedError> {
    Ok(serde_json::from_str(content)?)
}

fn required_secret(name: &'static str) -> Result<SecretString, SeedError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
        .ok_or(SeedError::MissingEnvVar(name))
}

/// Create every product in `file`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the operator cannot log in,
/// or any product is rejected.
pub async fn products(file: &Path, dry_run: bool) -> Result<(), CommandError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| SeedError::Read {
            path: file.to_path_buf(),
            source,
        })?;
    let products = parse_products(&content)?;
    info!(path = %file.display(), count = products.len(), "Loaded products file");

    if dry_run {
        for product in &products {
            info!(name = %product.name, price = %product.price, "Would create product");
        }
        return Ok(());
    }

    if products.is_empty() {
        warn!("Products file is empty, nothing to do");
        return Ok(());
    }

    let email = required_secret("ORIGEN_SEED_EMAIL")?;
    let password = required_secret("ORIGEN_SEED_PASSWORD")?;

    let client = backend_client()?;
    seed_catalogue(&client, &email, &password, &products).await?;
    Ok(())
}

/// Log in as the operator and create `products`, reporting each failure.
async fn seed_catalogue(
    client: &BackendClient,
    email: &SecretString,
    password: &SecretString,
    products: &[NewProduct],
) -> Result<SeedSummary, CommandError> {
    let auth = client
        .login(email.expose_secret(), password.expose_secret())
        .await?;
    info!(user = %auth.user.user_name, "Logged in as operator");

    let summary = create_all(client, &auth.token, products).await;

    info!("Seeding complete!");
    info!("  Products created: {}", summary.created);
    if !summary.failed.is_empty() {
        error!("  Failures: {}", summary.failed.len());
        for (name, reason) in &summary.failed {
            error!("    - {name}: {reason}");
        }
    }

    summary.check(products.len())?;
    Ok(summary)
}

async fn create_all(
    client: &BackendClient,
    token: &AccessToken,
    products: &[NewProduct],
) -> SeedSummary {
    let mut summary = SeedSummary::default();

    for product in products {
        match client.create_product(token, product).await {
            Ok(created) => {
                summary.created += 1;
                info!(
                    name = %product.name,
                    id = ?created.product.map(|p| p.id),
                    "Created product"
                );
            }
            Err(e) => {
                warn!(name = %product.name, error = %e, "Product rejected");
                summary.failed.push((product.name.clone(), e.user_message()));
            }
        }
    }

    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cafe_origen_integration_tests::{CUSTOMER_EMAIL, CUSTOMER_PASSWORD, FakeBackend};
    use cafe_origen_storefront::config::BackendConfig;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_products_file() {
        let products = parse_products(
            r#"[
                {"name": "Etiopía Yirgacheffe", "description": "Floral", "img": "https://img.example/e.jpg",
                 "brand": "Origen", "type": "grano", "price": 14.5},
                {"name": "Colombia Huila", "price": 12}
            ]"#,
        )
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].kind, "grano");
        assert_eq!(products[0].price, Decimal::new(145, 1));
        assert_eq!(products[1].brand, "");
    }

    #[test]
    fn test_parse_products_rejects_object() {
        let err = parse_products(r#"{"name": "solo"}"#).unwrap_err();
        assert!(matches!(err, SeedError::InvalidFile(_)));
    }

    #[test]
    fn test_bundled_catalogue_parses() {
        let content = include_str!("../../../../data/products.json");
        let products = parse_products(content).unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p.price > Decimal::ZERO));
    }

    fn operator() -> (SecretString, SecretString) {
        (
            SecretString::from(CUSTOMER_EMAIL),
            SecretString::from(CUSTOMER_PASSWORD),
        )
    }

    fn new_product(name: &str) -> NewProduct {
        parse_products(&format!(r#"[{{"name": "{name}", "price": 9.5}}]"#))
            .unwrap()
            .remove(0)
    }

    async fn fake_client() -> (FakeBackend, BackendClient) {
        let backend = FakeBackend::spawn().await;
        let config = BackendConfig::new(&backend.url()).unwrap();
        let client = BackendClient::new(&config).unwrap();
        (backend, client)
    }

    #[tokio::test]
    async fn test_seed_creates_every_product() {
        let (backend, client) = fake_client().await;
        let (email, password) = operator();
        let products = vec![new_product("Kenya AA"), new_product("Guatemala Antigua")];

        let summary = seed_catalogue(&client, &email, &password, &products)
            .await
            .unwrap();

        assert_eq!(summary.created, 2);
        assert!(summary.failed.is_empty());
        assert_eq!(backend.data().products.len(), 5);
    }

    #[tokio::test]
    async fn test_seed_reports_rejected_products() {
        let (backend, client) = fake_client().await;
        let (email, password) = operator();
        let products = vec![new_product("Kenya AA"), new_product("")];

        let err = seed_catalogue(&client, &email, &password, &products)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::Seed(SeedError::Incomplete {
                failed: 1,
                total: 2
            })
        ));
        assert_eq!(backend.data().products.len(), 4);
    }

    #[tokio::test]
    async fn test_seed_stops_on_bad_operator_login() {
        let (backend, client) = fake_client().await;
        let email = SecretString::from(CUSTOMER_EMAIL);
        let password = SecretString::from("not-the-password");

        let err = seed_catalogue(&client, &email, &password, &[new_product("Kenya AA")])
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Backend(_)));
        assert_eq!(backend.data().products.len(), 3);
    }

    #[test]
    fn test_summary_check() {
        let mut summary = SeedSummary {
            created: 3,
            failed: Vec::new(),
        };
        assert!(summary.check(3).is_ok());

        summary
            .failed
            .push(("Kenya AA".to_string(), "Fill all data".to_string()));
        assert!(matches!(
            summary.check(4),
            Err(SeedError::Incomplete { failed: 1, total: 4 })
        ));
    }

    #[test]
    fn test_incomplete_message() {
        let err = SeedError::Incomplete {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "2 of 5 products could not be created");
    }
}
