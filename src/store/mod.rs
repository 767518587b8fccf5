//! Persistence layer — libSQL-backed storage for campaigns, tenants,
//! quota accounts, delivery logs and tracked links.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::Store;
