//! PostgreSQL adapter for seqfix.
//!
//! [`PgDatabase`] implements the catalog, reader and writer ports from
//! `seqfix-core` over a `sqlx` connection pool bound to one schema.

mod database;
pub mod sql;

pub use database::{DEFAULT_MAX_CONNECTIONS, DEFAULT_SCHEMA, PgDatabase};
