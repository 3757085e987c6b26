//! Café de Origen storefront library.
//!
//! Server-rendered pages for the coffee shop, backed entirely by the REST
//! backend. Exposed as a library so the binary and the integration tests
//! build the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
