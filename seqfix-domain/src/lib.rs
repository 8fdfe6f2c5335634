//! Domain logic: decide which sequences are broken and where they should be moved.
//!
//! This crate owns *what* should be repaired and why. It performs no I/O; reading
//! catalog state and issuing the repair belong to `seqfix-core` and its adapters.

mod evaluate;
mod increment;
mod naming;
mod options;

pub use evaluate::{Evaluation, evaluate};
pub use increment::{ResolvedIncrement, opposes_recorded, resolve_increment};
pub use naming::{DEFAULT_SEQUENCE_TEMPLATE, SequenceNameTemplate, TemplateError};
pub use options::{
    DEFAULT_DATABASE_ALIAS, IncrementMode, OptionsError, RunOptions, RunOptionsBuilder,
    TableSelection, parse_table_list,
};
