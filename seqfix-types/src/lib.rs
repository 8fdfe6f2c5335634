//! Shared DTOs (schemas-as-code) for the seqfix workspace.
//!
//! # Design constraints
//! - The report types are serialized to disk and consumed by other tools.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod audit;
pub mod report;
pub mod sequence;

/// Schema identifiers.
pub mod schema {
    pub const SEQFIX_REPORT_V1: &str = "seqfix.report.v1";
}
