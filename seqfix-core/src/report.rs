//! Report builder: folds per-table results into a [`SeqfixReport`].

use crate::settings::AuditSettings;
use chrono::{DateTime, Utc};
use seqfix_types::audit::{AuditResult, RepairStatus};
use seqfix_types::report::{
    ReportDatabase, ReportOptions, ReportRunInfo, ReportStatus, ReportSummary, ReportToolInfo,
    ReportVerdict, SeqfixReport, SkippedTable, TableError,
};

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    tool: ReportToolInfo,
    database: ReportDatabase,
    options: ReportOptions,
    started_at: DateTime<Utc>,
    requested: u64,
    tables: Vec<AuditResult>,
    skipped: Vec<SkippedTable>,
    errors: Vec<TableError>,
}

impl ReportBuilder {
    pub fn new(tool: ReportToolInfo, settings: &AuditSettings) -> Self {
        let opts = &settings.options;
        Self {
            tool,
            database: ReportDatabase {
                alias: opts.database_alias().to_string(),
                schema: settings.schema.clone(),
            },
            options: ReportOptions {
                dry_run: opts.dry_run(),
                increment: opts.increment().to_string(),
                min_value: opts.min_value(),
                sequence_template: settings.sequence_template.to_string(),
            },
            started_at: Utc::now(),
            requested: 0,
            tables: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = at;
        self
    }

    pub fn set_requested(&mut self, n: usize) {
        self.requested = n as u64;
    }

    pub fn push_result(&mut self, result: AuditResult) {
        self.tables.push(result);
    }

    pub fn push_skipped(&mut self, skipped: SkippedTable) {
        self.skipped.push(skipped);
    }

    pub fn push_error(&mut self, error: TableError) {
        self.errors.push(error);
    }

    pub fn finish(self) -> SeqfixReport {
        let ended_at = Utc::now();
        let duration_ms = (ended_at - self.started_at).num_milliseconds().max(0) as u64;

        let summary = summarize(self.requested, &self.tables, &self.skipped, &self.errors);
        let broken_found = summary.broken > 0;

        let mut reasons = Vec::new();
        if summary.repair_failed > 0 {
            reasons.push("repair_failed".to_string());
        }
        if summary.table_errors > 0 {
            reasons.push("table_errors".to_string());
        }
        if broken_found {
            reasons.push("broken_sequences".to_string());
        }
        if summary.dry_run > 0 {
            reasons.push("dry_run".to_string());
        }

        let status = if summary.repair_failed > 0 || summary.table_errors > 0 {
            ReportStatus::Fail
        } else if broken_found {
            ReportStatus::Warn
        } else {
            ReportStatus::Pass
        };

        SeqfixReport {
            schema: seqfix_types::schema::SEQFIX_REPORT_V1.to_string(),
            tool: self.tool,
            run: ReportRunInfo {
                started_at: self.started_at.to_rfc3339(),
                ended_at: Some(ended_at.to_rfc3339()),
                duration_ms: Some(duration_ms),
            },
            database: self.database,
            options: self.options,
            verdict: ReportVerdict { status, reasons },
            summary,
            broken_found,
            tables: self.tables,
            skipped: self.skipped,
            errors: self.errors,
        }
    }
}

fn summarize(
    requested: u64,
    tables: &[AuditResult],
    skipped: &[SkippedTable],
    errors: &[TableError],
) -> ReportSummary {
    let mut s = ReportSummary {
        requested,
        audited: tables.len() as u64,
        skipped: skipped.len() as u64,
        table_errors: errors.len() as u64,
        ..ReportSummary::default()
    };
    for t in tables {
        if t.broken {
            s.broken += 1;
        } else {
            s.healthy += 1;
        }
        match t.repair {
            RepairStatus::NotNeeded => {}
            RepairStatus::DryRun => s.dry_run += 1,
            RepairStatus::Applied { .. } => s.fixed += 1,
            RepairStatus::Superseded { .. } => s.superseded += 1,
            RepairStatus::Failed { .. } => s.repair_failed += 1,
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use seqfix_domain::RunOptions;
    use seqfix_types::audit::IncrementSource;
    use seqfix_types::report::ErrorStage;
    use seqfix_types::sequence::MaxKey;

    fn tool() -> ReportToolInfo {
        ReportToolInfo {
            name: "seqfix".to_string(),
            version: "0.0.0".to_string(),
        }
    }

    fn result(table: &str, broken: bool, repair: RepairStatus) -> AuditResult {
        AuditResult {
            table: table.to_string(),
            sequence: format!("{table}_id_seq"),
            column: "id".to_string(),
            current_value: 1,
            max_value: MaxKey::Value(2),
            resolved_increment: 1,
            increment_source: IncrementSource::Default,
            broken,
            target_value: 2,
            repair,
        }
    }

    #[test]
    fn empty_run_passes() {
        let report = ReportBuilder::new(tool(), &AuditSettings::default()).finish();
        assert_eq!(report.verdict.status, ReportStatus::Pass);
        assert!(!report.broken_found);
        assert!(report.verdict.reasons.is_empty());
        assert_eq!(report.schema, "seqfix.report.v1");
        assert_eq!(report.database.alias, "default");
        assert_eq!(report.options.sequence_template, "{table}_id_seq");
    }

    #[test]
    fn fixed_tables_still_signal_broken_found() {
        let mut b = ReportBuilder::new(tool(), &AuditSettings::default());
        b.set_requested(2);
        b.push_result(result("orders", true, RepairStatus::Applied { attempts: 1 }));
        b.push_result(result("items", false, RepairStatus::NotNeeded));
        let report = b.finish();

        assert!(report.broken_found);
        assert_eq!(report.verdict.status, ReportStatus::Warn);
        assert_eq!(
            report.summary,
            ReportSummary {
                requested: 2,
                audited: 2,
                healthy: 1,
                broken: 1,
                fixed: 1,
                ..ReportSummary::default()
            }
        );
    }

    #[test]
    fn dry_run_reason_and_options_echo() {
        let opts = RunOptions::builder()
            .dry_run(true)
            .auto(true)
            .min_value(Some(100))
            .build()
            .expect("options");
        let mut b = ReportBuilder::new(tool(), &AuditSettings::new(opts));
        b.push_result(result("orders", true, RepairStatus::DryRun));
        let report = b.finish();

        assert_eq!(report.verdict.reasons, vec!["broken_sequences", "dry_run"]);
        assert!(report.options.dry_run);
        assert_eq!(report.options.increment, "auto");
        assert_eq!(report.options.min_value, Some(100));
    }

    #[test]
    fn failures_turn_verdict_to_fail() {
        let mut b = ReportBuilder::new(tool(), &AuditSettings::default());
        b.push_result(result("orders", true, RepairStatus::Failed {
            reason: "permission denied".to_string(),
        }));
        b.push_error(TableError {
            table: "items".to_string(),
            stage: ErrorStage::ReadState,
            message: "boom".to_string(),
        });
        b.push_skipped(SkippedTable {
            table: "logs".to_string(),
            expected_sequence: "logs_id_seq".to_string(),
        });
        let report = b.finish();

        assert_eq!(report.verdict.status, ReportStatus::Fail);
        assert_eq!(
            report.verdict.reasons,
            vec!["repair_failed", "table_errors", "broken_sequences"]
        );
        assert_eq!(report.summary.repair_failed, 1);
        assert_eq!(report.summary.table_errors, 1);
        assert_eq!(report.summary.skipped, 1);
    }

    #[test]
    fn run_info_has_timestamps() {
        let started = Utc::now() - chrono::Duration::milliseconds(5);
        let report = ReportBuilder::new(tool(), &AuditSettings::default())
            .started_at(started)
            .finish();
        assert_eq!(report.run.started_at, started.to_rfc3339());
        assert!(report.run.ended_at.is_some());
        assert!(report.run.duration_ms.is_some_and(|ms| ms >= 5));
    }
}
