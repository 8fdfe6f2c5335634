//! Core audit pipeline, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: all catalog reads, sequence reads and
//! sequence writes go through the port traits.

use crate::error::{ConfigError, ToolError};
use crate::ports::{CatalogPort, SequenceReader, SequenceWriter};
use crate::repair::{RepairRequest, repair_sequence};
use crate::report::ReportBuilder;
use crate::settings::AuditSettings;
use anyhow::Context;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use seqfix_domain::{TableSelection, evaluate, opposes_recorded, resolve_increment};
use seqfix_types::audit::{AuditResult, RepairStatus};
use seqfix_types::report::{
    ErrorStage, ReportToolInfo, SeqfixReport, SkippedTable, TableError,
};
use seqfix_types::sequence::{IdentitySequence, TableInventory};
use tracing::{debug, warn};

/// Outcome of `run_audit`.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub report: SeqfixReport,
}

impl AuditOutcome {
    pub fn broken_found(&self) -> bool {
        self.report.broken_found
    }
}

/// Tables that survived catalog filtering, plus what was dropped and why.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub requested: usize,
    pub targets: Vec<IdentitySequence>,
    pub skipped: Vec<SkippedTable>,
    pub errors: Vec<TableError>,
}

/// Resolve the requested tables and keep those owning a matching identity sequence.
///
/// Every explicitly named table is checked for existence before anything else
/// happens; a missing one fails the whole run.
pub async fn discover_targets(
    settings: &AuditSettings,
    catalog: &dyn CatalogPort,
) -> Result<Discovery, ToolError> {
    let tables = resolve_tables(settings, catalog).await?;

    let mut discovery = Discovery {
        requested: tables.len(),
        ..Discovery::default()
    };

    for table in tables {
        let expected = settings.sequence_template.render(&table);
        match catalog.identity_sequence(&table, &expected).await {
            Ok(Some(target)) => {
                debug!(table = %table, sequence = %target.sequence, column = %target.column, "identity sequence found");
                discovery.targets.push(target);
            }
            Ok(None) => {
                debug!(table = %table, sequence = %expected, "no matching identity sequence; skipping");
                discovery.skipped.push(SkippedTable {
                    table,
                    expected_sequence: expected,
                });
            }
            Err(err) => {
                warn!(table = %table, error = %format!("{err:#}"), "catalog lookup failed");
                discovery.errors.push(TableError {
                    table,
                    stage: ErrorStage::Catalog,
                    message: format!("{err:#}"),
                });
            }
        }
    }

    Ok(discovery)
}

async fn resolve_tables(
    settings: &AuditSettings,
    catalog: &dyn CatalogPort,
) -> Result<Vec<String>, ToolError> {
    match settings.options.tables() {
        TableSelection::All => Ok(catalog.list_tables().await.context("list tables")?),
        TableSelection::Named(names) => {
            for name in names {
                let exists = catalog
                    .table_exists(name)
                    .await
                    .with_context(|| format!("check table {} exists", name))?;
                if !exists {
                    return Err(ConfigError::UnknownTable(name.clone()).into());
                }
            }
            Ok(names.clone())
        }
    }
}

/// Run the audit pipeline: discover, evaluate, repair unless dry-run, report.
///
/// Per-table read and repair failures are recorded in the report and never
/// stop the batch. Only configuration errors and failures before the table
/// loop are returned as `Err`.
pub async fn run_audit(
    settings: &AuditSettings,
    catalog: &dyn CatalogPort,
    reader: &dyn SequenceReader,
    writer: &dyn SequenceWriter,
    tool: ReportToolInfo,
) -> Result<AuditOutcome, ToolError> {
    let mut builder = ReportBuilder::new(tool, settings).started_at(Utc::now());

    let discovery = discover_targets(settings, catalog).await?;
    builder.set_requested(discovery.requested);
    for skipped in discovery.skipped {
        builder.push_skipped(skipped);
    }
    for error in discovery.errors {
        builder.push_error(error);
    }

    // Tables are independent; `buffered` keeps results in request order.
    let results: Vec<Result<AuditResult, TableError>> = stream::iter(discovery.targets.iter())
        .map(|target| audit_table(settings, reader, writer, target))
        .buffered(settings.jobs.max(1))
        .collect()
        .await;

    for result in results {
        match result {
            Ok(audit) => builder.push_result(audit),
            Err(error) => builder.push_error(error),
        }
    }

    Ok(AuditOutcome {
        report: builder.finish(),
    })
}

async fn audit_table(
    settings: &AuditSettings,
    reader: &dyn SequenceReader,
    writer: &dyn SequenceWriter,
    target: &IdentitySequence,
) -> Result<AuditResult, TableError> {
    let opts = &settings.options;

    let state = reader
        .read_state(target)
        .await
        .map_err(|err| table_error(target, ErrorStage::ReadState, err))?;
    let stats = reader
        .read_max_key(target)
        .await
        .map_err(|err| table_error(target, ErrorStage::ReadMaxKey, err))?;

    let resolved = resolve_increment(opts.increment(), state.increment);
    // An empty table is healthy in either direction, so only stored keys can conflict.
    if !stats.max_key.is_empty() && opposes_recorded(resolved.step, state.increment) {
        return Err(table_error(
            target,
            ErrorStage::Direction,
            anyhow::anyhow!(
                "increment {} runs against the sequence's own increment {}; not judged",
                resolved.step,
                state.increment
            ),
        ));
    }
    let leading = stats.leading_key(resolved.step.get() > 0);
    let eval = evaluate(
        state.current_value,
        leading,
        resolved.step,
        opts.min_value(),
    );

    debug!(
        table = %target.table,
        current = state.current_value,
        max_key = %leading,
        increment = resolved.step.get(),
        broken = eval.broken,
        target = eval.target_value,
        "evaluated sequence"
    );

    let (repair, target_value) = if !eval.broken {
        (RepairStatus::NotNeeded, eval.target_value)
    } else if opts.dry_run() {
        (RepairStatus::DryRun, eval.target_value)
    } else {
        let result = repair_sequence(
            reader,
            writer,
            RepairRequest {
                target,
                expected: state.clone(),
                value: eval.target_value,
                increment: opts.increment(),
                floor: opts.min_value(),
                max_attempts: settings.repair_attempts,
            },
        )
        .await;
        (result.status, result.target_value)
    };

    Ok(AuditResult {
        table: target.table.clone(),
        sequence: target.sequence.clone(),
        column: target.column.clone(),
        current_value: state.current_value,
        max_value: leading,
        resolved_increment: resolved.step.get(),
        increment_source: resolved.source,
        broken: eval.broken,
        target_value,
        repair,
    })
}

/// List the requested tables with their identity sequence state. Read-only.
///
/// Unlike `run_audit`, a catalog or read failure is kept on the row it
/// belongs to.
pub async fn inventory(
    settings: &AuditSettings,
    catalog: &dyn CatalogPort,
    reader: &dyn SequenceReader,
) -> Result<Vec<TableInventory>, ToolError> {
    let tables = resolve_tables(settings, catalog).await?;

    let rows = stream::iter(tables)
        .map(|table| async move {
            let expected = settings.sequence_template.render(&table);
            let mut row = TableInventory {
                table,
                identity: None,
                state: None,
                keys: None,
                error: None,
            };
            match catalog.identity_sequence(&row.table, &expected).await {
                Ok(Some(target)) => {
                    match reader.read_state(&target).await {
                        Ok(state) => row.state = Some(state),
                        Err(err) => row.error = Some(format!("{err:#}")),
                    }
                    match reader.read_max_key(&target).await {
                        Ok(keys) => row.keys = Some(keys),
                        Err(err) => {
                            row.error.get_or_insert_with(|| format!("{err:#}"));
                        }
                    }
                    row.identity = Some(target);
                }
                Ok(None) => {}
                Err(err) => row.error = Some(format!("{err:#}")),
            }
            row
        })
        .buffered(settings.jobs.max(1))
        .collect()
        .await;

    Ok(rows)
}

fn table_error(target: &IdentitySequence, stage: ErrorStage, err: anyhow::Error) -> TableError {
    warn!(table = %target.table, ?stage, error = %format!("{err:#}"), "table audit failed");
    TableError {
        table: target.table.clone(),
        stage,
        message: format!("{err:#}"),
    }
}
