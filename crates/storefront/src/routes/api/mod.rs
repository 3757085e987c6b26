//! JSON API routes used by page scripts.

pub mod store;
