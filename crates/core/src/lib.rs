//! Café de Origen Core - Shared types library.
//!
//! This crate provides common types used across all Café de Origen components:
//! - `storefront` - Public-facing e-commerce site
//! - `cli` - Command-line tools for seeding and checking the backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. The REST
//! backend owns every entity; these types only describe what the storefront
//! receives from it and renders.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
