//! Clap-free settings for the audit pipeline.

use seqfix_domain::{RunOptions, SequenceNameTemplate};

pub const DEFAULT_JOBS: usize = 4;
pub const DEFAULT_REPAIR_ATTEMPTS: u32 = 3;

/// Settings for one audit run.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub options: RunOptions,
    pub sequence_template: SequenceNameTemplate,

    /// Schema the adapter is bound to, echoed in the report.
    pub schema: Option<String>,

    // Execution
    pub jobs: usize,
    pub repair_attempts: u32,
}

impl AuditSettings {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            options: RunOptions::default(),
            sequence_template: SequenceNameTemplate::default(),
            schema: None,
            jobs: DEFAULT_JOBS,
            repair_attempts: DEFAULT_REPAIR_ATTEMPTS,
        }
    }
}
