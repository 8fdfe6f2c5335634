//! Rendering helpers (plain text and markdown) for audit reports.

use seqfix_types::audit::{AuditResult, IncrementSource, RepairStatus};
use seqfix_types::report::{ErrorStage, ReportStatus, SeqfixReport};
use seqfix_types::sequence::TableInventory;

/// Console output for an audit run.
///
/// Verbosity 0 prints nothing. 1 prints broken sequences under the dry-run or
/// fixed heading, plus failures. 2 adds healthy and skipped tables and the
/// summary. 3 also shows where each increment came from.
pub fn render_text(report: &SeqfixReport, verbosity: u8) -> String {
    let mut out = String::new();
    if verbosity == 0 {
        return out;
    }
    let detail = verbosity >= 3;

    let dry_run: Vec<_> = report.still_broken().collect();
    if !dry_run.is_empty() {
        out.push_str("Broken sequences:\n");
        for t in dry_run {
            push_line(&mut out, t, detail);
        }
    }

    let fixed: Vec<_> = report.fixed().collect();
    if !fixed.is_empty() {
        out.push_str("Following sequences were fixed:\n");
        for t in fixed {
            push_line(&mut out, t, detail);
        }
    }

    let superseded: Vec<_> = report.superseded().collect();
    if !superseded.is_empty() {
        out.push_str("Already moved by another writer:\n");
        for t in superseded {
            push_line(&mut out, t, detail);
        }
    }

    let failed: Vec<_> = report.repair_failed().collect();
    if !failed.is_empty() {
        out.push_str("Repair failed:\n");
        for t in failed {
            push_line(&mut out, t, detail);
            if let RepairStatus::Failed { reason } = &t.repair {
                out.push_str(&format!("    {}\n", reason));
            }
        }
    }

    if !report.errors.is_empty() {
        out.push_str("Errors:\n");
        for e in &report.errors {
            out.push_str(&format!(
                "  {} ({}): {}\n",
                e.table,
                stage_label(e.stage),
                e.message
            ));
        }
    }

    if verbosity < 2 {
        return out;
    }

    let healthy: Vec<_> = report.healthy().collect();
    if !healthy.is_empty() {
        out.push_str("Healthy sequences:\n");
        for t in healthy {
            push_line(&mut out, t, detail);
        }
    }

    if !report.skipped.is_empty() {
        out.push_str("Skipped (no matching identity sequence):\n");
        for s in &report.skipped {
            out.push_str(&format!("  {} (looked for {})\n", s.table, s.expected_sequence));
        }
    }

    let s = &report.summary;
    out.push_str(&format!(
        "{}: {} audited, {} broken, {} fixed, {} skipped, {} failed\n",
        status_label(report.verdict.status),
        s.audited,
        s.broken,
        s.fixed,
        s.skipped,
        s.repair_failed + s.table_errors
    ));

    out
}

fn push_line(out: &mut String, t: &AuditResult, detail: bool) {
    out.push_str(&format!(
        "  {}.{}: current {}, max key {}, target {}",
        t.table, t.column, t.current_value, t.max_value, t.target_value
    ));
    if detail {
        out.push_str(&format!(
            ", increment {} ({})",
            t.resolved_increment,
            source_label(t.increment_source)
        ));
    }
    out.push('\n');
}

pub fn render_report_md(report: &SeqfixReport) -> String {
    let mut out = String::new();
    out.push_str("# seqfix audit\n\n");
    out.push_str(&format!(
        "- Verdict: `{}`\n",
        status_label(report.verdict.status)
    ));
    out.push_str(&format!("- Database: `{}`", report.database.alias));
    if let Some(schema) = &report.database.schema {
        out.push_str(&format!(" (schema `{}`)", schema));
    }
    out.push('\n');
    out.push_str(&format!("- Dry run: `{}`\n", report.options.dry_run));
    out.push_str(&format!("- Increment: `{}`\n", report.options.increment));
    if let Some(floor) = report.options.min_value {
        out.push_str(&format!("- Minimum value: `{}`\n", floor));
    }
    let s = &report.summary;
    out.push_str(&format!(
        "- Audited: {} (broken {}, fixed {}, superseded {}, failed {})\n",
        s.audited, s.broken, s.fixed, s.superseded, s.repair_failed
    ));
    out.push_str(&format!(
        "- Skipped: {}\n- Table errors: {}\n\n",
        s.skipped, s.table_errors
    ));

    out.push_str("## Sequences\n\n");
    if report.tables.is_empty() {
        out.push_str("_No sequences audited._\n");
    } else {
        out.push_str("| Table | Sequence | Current | Max key | Increment | Target | Status |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for t in &report.tables {
            out.push_str(&format!(
                "| `{}` | `{}` | {} | {} | {} ({}) | {} | `{}` |\n",
                t.table,
                t.sequence,
                t.current_value,
                t.max_value,
                t.resolved_increment,
                source_label(t.increment_source),
                t.target_value,
                t.repair.label()
            ));
        }
    }

    if !report.skipped.is_empty() {
        out.push_str("\n## Skipped\n\n");
        for s in &report.skipped {
            out.push_str(&format!(
                "- `{}`: no identity sequence `{}`\n",
                s.table, s.expected_sequence
            ));
        }
    }

    let failures: Vec<_> = report.repair_failed().collect();
    if !failures.is_empty() || !report.errors.is_empty() {
        out.push_str("\n## Errors\n\n");
        for t in failures {
            if let RepairStatus::Failed { reason } = &t.repair {
                out.push_str(&format!("- `{}` (repair): {}\n", t.table, reason));
            }
        }
        for e in &report.errors {
            out.push_str(&format!(
                "- `{}` ({}): {}\n",
                e.table,
                stage_label(e.stage),
                e.message
            ));
        }
    }

    out
}

/// One line per table for `seqfix tables`.
pub fn render_inventory_text(rows: &[TableInventory]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<32} {:<40} {:>12} {:>12} {:>6}\n",
        "TABLE", "SEQUENCE", "CURRENT", "MAX KEY", "STEP"
    ));
    for row in rows {
        let sequence = row
            .identity
            .as_ref()
            .map(|i| format!("{} ({})", i.sequence, i.column))
            .unwrap_or_else(|| "-".to_string());
        let current = row
            .state
            .as_ref()
            .map(|s| s.current_value.to_string())
            .unwrap_or_else(|| "-".to_string());
        let step = row
            .state
            .as_ref()
            .map(|s| s.increment.to_string())
            .unwrap_or_else(|| "-".to_string());
        let max_key = row
            .keys
            .as_ref()
            .map(|k| k.max_key.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:<32} {:<40} {:>12} {:>12} {:>6}\n",
            row.table, sequence, current, max_key, step
        ));
        if let Some(err) = &row.error {
            out.push_str(&format!("    error: {}\n", err));
        }
    }
    out
}

fn status_label(s: ReportStatus) -> &'static str {
    match s {
        ReportStatus::Pass => "pass",
        ReportStatus::Warn => "warn",
        ReportStatus::Fail => "fail",
    }
}

fn stage_label(s: ErrorStage) -> &'static str {
    match s {
        ErrorStage::Catalog => "catalog",
        ErrorStage::ReadState => "read state",
        ErrorStage::ReadMaxKey => "read max key",
        ErrorStage::Direction => "direction",
    }
}

fn source_label(s: IncrementSource) -> &'static str {
    match s {
        IncrementSource::Explicit => "explicit",
        IncrementSource::Sequence => "sequence",
        IncrementSource::Default => "default",
    }
}
