use crate::audit::{AuditResult, RepairStatus};
use serde::{Deserialize, Serialize};

/// Structured outcome of one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqfixReport {
    pub schema: String,
    pub tool: ReportToolInfo,
    pub run: ReportRunInfo,
    pub database: ReportDatabase,
    pub options: ReportOptions,
    pub verdict: ReportVerdict,
    pub summary: ReportSummary,

    /// True when any audited sequence was found broken, whether or not it was
    /// repaired. Callers derive their exit status from this.
    pub broken_found: bool,

    /// Audited tables, in the order they were requested.
    #[serde(default)]
    pub tables: Vec<AuditResult>,

    /// Tables excluded because they own no sequence matching the template.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedTable>,

    /// Tables whose catalog or state read failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TableError>,
}

impl SeqfixReport {
    pub fn get(&self, table: &str) -> Option<&AuditResult> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Broken sequences that now hold their target value.
    pub fn fixed(&self) -> impl Iterator<Item = &AuditResult> {
        self.tables.iter().filter(|t| t.is_fixed())
    }

    /// Broken sequences left as-is because the run was a dry-run.
    pub fn still_broken(&self) -> impl Iterator<Item = &AuditResult> {
        self.tables
            .iter()
            .filter(|t| matches!(t.repair, RepairStatus::DryRun))
    }

    pub fn repair_failed(&self) -> impl Iterator<Item = &AuditResult> {
        self.tables.iter().filter(|t| t.is_repair_failed())
    }

    pub fn superseded(&self) -> impl Iterator<Item = &AuditResult> {
        self.tables
            .iter()
            .filter(|t| matches!(t.repair, RepairStatus::Superseded { .. }))
    }

    pub fn healthy(&self) -> impl Iterator<Item = &AuditResult> {
        self.tables.iter().filter(|t| !t.broken)
    }

    pub fn broken(&self) -> impl Iterator<Item = &AuditResult> {
        self.tables.iter().filter(|t| t.broken)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRunInfo {
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDatabase {
    pub alias: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Echo of the options the run was evaluated under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    pub dry_run: bool,

    /// `default`, `auto`, or the explicit step.
    pub increment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,

    pub sequence_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVerdict {
    pub status: ReportStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub requested: u64,
    pub audited: u64,
    pub skipped: u64,
    pub healthy: u64,
    pub broken: u64,
    pub fixed: u64,
    pub dry_run: u64,
    pub superseded: u64,
    pub repair_failed: u64,
    pub table_errors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTable {
    pub table: String,
    /// Sequence name that was looked for.
    pub expected_sequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableError {
    pub table: String,
    pub stage: ErrorStage,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    Catalog,
    ReadState,
    ReadMaxKey,
    /// The increment used for judging runs against the sequence's own.
    Direction,
}
