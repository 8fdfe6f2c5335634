use crate::options::IncrementMode;
use seqfix_types::audit::IncrementSource;
use std::num::NonZeroI64;

const STEP_ONE: NonZeroI64 = match NonZeroI64::new(1) {
    Some(step) => step,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIncrement {
    pub step: NonZeroI64,
    pub source: IncrementSource,
}

impl ResolvedIncrement {
    fn default_step() -> Self {
        Self {
            step: STEP_ONE,
            source: IncrementSource::Default,
        }
    }
}

/// Pick the step used to judge a sequence.
///
/// `recorded` is the increment stored on the sequence itself. Auto mode reads
/// it as-is; it never infers a step from gaps between stored keys.
pub fn resolve_increment(mode: IncrementMode, recorded: i64) -> ResolvedIncrement {
    match mode {
        IncrementMode::Explicit(step) => ResolvedIncrement {
            step,
            source: IncrementSource::Explicit,
        },
        IncrementMode::Auto => match NonZeroI64::new(recorded) {
            Some(step) => ResolvedIncrement {
                step,
                source: IncrementSource::Sequence,
            },
            None => ResolvedIncrement::default_step(),
        },
        IncrementMode::Default => ResolvedIncrement::default_step(),
    }
}

/// True when `step` draws the opposite way to the increment recorded on the
/// sequence. A recorded 0 carries no direction and never conflicts.
pub fn opposes_recorded(step: NonZeroI64, recorded: i64) -> bool {
    recorded != 0 && (step.get() > 0) != (recorded > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(v: i64) -> NonZeroI64 {
        NonZeroI64::new(v).expect("nonzero")
    }

    #[test]
    fn explicit_wins_over_recorded() {
        let r = resolve_increment(IncrementMode::Explicit(nz(-1)), 5);
        assert_eq!(r.step.get(), -1);
        assert_eq!(r.source, IncrementSource::Explicit);
    }

    #[test]
    fn auto_reads_sequence_increment() {
        let r = resolve_increment(IncrementMode::Auto, -10);
        assert_eq!(r.step.get(), -10);
        assert_eq!(r.source, IncrementSource::Sequence);
    }

    #[test]
    fn auto_with_unusable_metadata_falls_back_to_one() {
        let r = resolve_increment(IncrementMode::Auto, 0);
        assert_eq!(r.step.get(), 1);
        assert_eq!(r.source, IncrementSource::Default);
    }

    #[test]
    fn opposite_signs_oppose() {
        assert!(opposes_recorded(nz(-1), 1));
        assert!(opposes_recorded(nz(1), -5));
        assert!(!opposes_recorded(nz(2), 1));
        assert!(!opposes_recorded(nz(-3), -1));
        assert!(!opposes_recorded(nz(-1), 0));
    }

    #[test]
    fn default_ignores_recorded() {
        let r = resolve_increment(IncrementMode::Default, -3);
        assert_eq!(r.step.get(), 1);
        assert_eq!(r.source, IncrementSource::Default);
    }
}
