use seqfix_types::sequence::MaxKey;
use std::num::NonZeroI64;

/// Outcome of judging one sequence against its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub broken: bool,
    /// Value the sequence should hold. Equals the current value when healthy.
    pub target_value: i64,
}

impl Evaluation {
    fn healthy(current: i64) -> Self {
        Self {
            broken: false,
            target_value: current,
        }
    }
}

/// Decide whether a sequence is broken and where a repair should move it.
///
/// The target is the highest key in use (never one step past it): after a
/// repair the next draw applies the increment and lands beyond every stored
/// key. A sequence sitting exactly on the max key is therefore healthy.
///
/// `max_key` is the stored key furthest along the draw direction: the largest
/// key for an ascending step, the smallest for a descending one.
///
/// - Empty tables are never broken, whatever the step or floor.
/// - Ascending: broken iff `current < max(max_key, floor)`.
/// - Descending: broken iff `current > max_key`. The floor does not apply.
pub fn evaluate(
    current: i64,
    max_key: MaxKey,
    step: NonZeroI64,
    floor: Option<i64>,
) -> Evaluation {
    let MaxKey::Value(max_key) = max_key else {
        return Evaluation::healthy(current);
    };

    if step.get() > 0 {
        let threshold = match floor {
            Some(floor) => max_key.max(floor),
            None => max_key,
        };
        if current < threshold {
            return Evaluation {
                broken: true,
                target_value: threshold,
            };
        }
    } else if current > max_key {
        return Evaluation {
            broken: true,
            target_value: max_key,
        };
    }

    Evaluation::healthy(current)
}
