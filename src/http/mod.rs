//! Thin HTTP surface over the dispatch core.

pub mod routes;

pub use routes::{ApiState, api_routes};
