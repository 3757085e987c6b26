//! Cache types for product responses.

use std::sync::Arc;

use cafe_origen_core::ProductId;

use super::types::Product;

/// Cache key for product responses.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}
