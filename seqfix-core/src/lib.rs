//! Embeddable core library for seqfix.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into a CLI, a migration runner, or an ops service.
//!
//! # Port traits
//!
//! All database access is abstracted behind port traits in [`ports`]:
//! - [`CatalogPort`](ports::CatalogPort): table and identity sequence discovery
//! - [`SequenceReader`](ports::SequenceReader): sequence state and max key
//! - [`SequenceWriter`](ports::SequenceWriter): compare-and-set repair
//!
//! The [`adapters`] module provides an in-memory implementation; the
//! PostgreSQL implementation lives in `seqfix-pg`.
//!
//! # Entry points
//!
//! - [`run_audit`](pipeline::run_audit): audit, repair unless dry-run, report
//! - [`discover_targets`](pipeline::discover_targets): catalog filtering only
//! - [`inventory`](pipeline::inventory): read-only listing of tables and sequence state

pub mod adapters;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod report;
pub mod settings;

mod repair;

pub use error::{ConfigError, ToolError};

// Re-export domain types so callers don't need seqfix-domain directly.
pub use seqfix_domain::{
    DEFAULT_DATABASE_ALIAS, IncrementMode, RunOptions, RunOptionsBuilder, SequenceNameTemplate,
    TableSelection, parse_table_list,
};
