//! Error types for the seqfix pipeline.
//!
//! This module distinguishes between:
//! - Configuration errors: raised before any table is touched
//! - Internal errors: database or I/O failures outside the per-table loop
//!
//! Per-table failures are never errors here; they are recorded in the report.

use seqfix_domain::{OptionsError, TemplateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    InvalidTemplate(#[from] TemplateError),

    #[error("table {0} does not exist")]
    UnknownTable(String),

    #[error("unknown database alias '{0}'")]
    UnknownDatabaseAlias(String),

    #[error("no database url configured for alias '{0}'")]
    MissingDatabaseUrl(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error type for pipeline results.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn is_config(&self) -> bool {
        matches!(self, ToolError::Config(_))
    }
}

impl From<OptionsError> for ToolError {
    fn from(err: OptionsError) -> Self {
        ToolError::Config(ConfigError::Options(err))
    }
}
