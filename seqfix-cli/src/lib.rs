//! Library half of the `seqfix` binary: audit flags, configuration loading and merging.

pub mod args;
pub mod config;
