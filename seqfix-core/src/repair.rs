//! Repair executor: moves a broken sequence to its target with compare-and-set.

use crate::ports::{CasOutcome, SequenceReader, SequenceWriter};
use seqfix_domain::{IncrementMode, evaluate, opposes_recorded, resolve_increment};
use seqfix_types::audit::RepairStatus;
use seqfix_types::sequence::{IdentitySequence, SequenceState};
use tracing::{info, warn};

pub(crate) struct RepairRequest<'a> {
    pub target: &'a IdentitySequence,
    pub expected: SequenceState,
    pub value: i64,
    pub increment: IncrementMode,
    pub floor: Option<i64>,
    pub max_attempts: u32,
}

/// Final status plus the value the sequence was (or would have been) set to.
pub(crate) struct RepairResult {
    pub status: RepairStatus,
    pub target_value: i64,
}

/// Apply a repair, re-validating whenever the sequence moved since it was read.
///
/// A stale write never overwrites: the fresh state and max key are re-read and
/// re-evaluated, and the write is retried against the new expectation. If the
/// sequence is no longer broken another writer got there first.
pub(crate) async fn repair_sequence(
    reader: &dyn SequenceReader,
    writer: &dyn SequenceWriter,
    req: RepairRequest<'_>,
) -> RepairResult {
    let RepairRequest {
        target,
        mut expected,
        mut value,
        increment,
        floor,
        max_attempts,
    } = req;
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match writer.compare_and_set(target, &expected, value).await {
            Ok(CasOutcome::Applied) => {
                info!(
                    table = %target.table,
                    sequence = %target.sequence,
                    from = expected.current_value,
                    to = value,
                    "sequence repaired"
                );
                return RepairResult {
                    status: RepairStatus::Applied { attempts: attempt },
                    target_value: value,
                };
            }
            Ok(CasOutcome::Stale(fresh)) => {
                warn!(
                    table = %target.table,
                    expected = expected.current_value,
                    actual = fresh.current_value,
                    attempt,
                    "sequence moved since it was read; re-validating"
                );
                let stats = match reader.read_max_key(target).await {
                    Ok(stats) => stats,
                    Err(err) => {
                        return failed(target, value, format!("re-read max key: {err:#}"));
                    }
                };
                let resolved = resolve_increment(increment, fresh.increment);
                if !stats.max_key.is_empty() && opposes_recorded(resolved.step, fresh.increment) {
                    return failed(
                        target,
                        value,
                        format!(
                            "sequence increment changed to {}, against the step {}",
                            fresh.increment, resolved.step
                        ),
                    );
                }
                let leading = stats.leading_key(resolved.step.get() > 0);
                let eval = evaluate(fresh.current_value, leading, resolved.step, floor);
                if !eval.broken {
                    return RepairResult {
                        status: RepairStatus::Superseded {
                            current_value: fresh.current_value,
                        },
                        target_value: fresh.current_value,
                    };
                }
                expected = fresh;
                value = eval.target_value;
            }
            Err(err) => return failed(target, value, format!("{err:#}")),
        }
    }

    failed(
        target,
        value,
        format!("sequence kept changing; gave up after {max_attempts} attempts"),
    )
}

fn failed(target: &IdentitySequence, value: i64, reason: String) -> RepairResult {
    warn!(table = %target.table, reason = %reason, "sequence repair failed");
    RepairResult {
        status: RepairStatus::Failed { reason },
        target_value: value,
    }
}
