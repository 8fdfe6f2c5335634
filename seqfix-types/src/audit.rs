use crate::sequence::MaxKey;
use serde::{Deserialize, Serialize};

/// Where the increment used for evaluation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementSource {
    /// Supplied by the operator.
    Explicit,
    /// Read from the sequence metadata (auto-detect).
    Sequence,
    /// Neither given nor detectable; step of 1.
    Default,
}

/// What happened to a sequence after evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairStatus {
    /// Sequence was healthy; nothing to do.
    NotNeeded,
    /// Broken, but the run was a dry-run.
    DryRun,
    /// The sequence now holds `target_value`.
    Applied { attempts: u32 },
    /// Another writer moved the sequence past the max key before the write.
    Superseded { current_value: i64 },
    Failed { reason: String },
}

impl RepairStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RepairStatus::NotNeeded => "not_needed",
            RepairStatus::DryRun => "dry_run",
            RepairStatus::Applied { .. } => "applied",
            RepairStatus::Superseded { .. } => "superseded",
            RepairStatus::Failed { .. } => "failed",
        }
    }
}

/// Verdict for one audited table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub table: String,
    pub sequence: String,
    pub column: String,

    pub current_value: i64,
    pub max_value: MaxKey,

    pub resolved_increment: i64,
    pub increment_source: IncrementSource,

    pub broken: bool,

    /// Value the sequence should hold. Equals `current_value` when healthy.
    pub target_value: i64,

    pub repair: RepairStatus,
}

impl AuditResult {
    pub fn is_fixed(&self) -> bool {
        matches!(self.repair, RepairStatus::Applied { .. })
    }

    pub fn is_repair_failed(&self) -> bool {
        matches!(self.repair, RepairStatus::Failed { .. })
    }
}
