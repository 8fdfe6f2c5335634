use serde::{Deserialize, Serialize};
use std::fmt;

/// A table together with the identity sequence that feeds its primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentitySequence {
    pub table: String,
    pub sequence: String,
    /// Primary key column the sequence is owned by.
    pub column: String,
}

/// Snapshot of a sequence as recorded by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceState {
    pub table: String,
    pub sequence: String,

    /// Effective current value: the last value handed out, or the value
    /// before the first draw when the sequence has never been called.
    pub current_value: i64,

    /// Step recorded on the sequence. Zero means the metadata was unusable.
    pub increment: i64,

    /// Whether the sequence has been drawn from since its last reset.
    #[serde(default = "default_true")]
    pub is_called: bool,
}

fn default_true() -> bool {
    true
}

impl SequenceState {
    /// Normalize PostgreSQL's `(last_value, is_called)` pair.
    ///
    /// An uncalled sequence returns `last_value` itself on the next draw, so
    /// it behaves as if it currently held `last_value - increment`.
    pub fn from_raw(
        table: impl Into<String>,
        sequence: impl Into<String>,
        last_value: i64,
        is_called: bool,
        increment: i64,
    ) -> Self {
        let current_value = if is_called {
            last_value
        } else {
            last_value.checked_sub(increment).unwrap_or(last_value)
        };
        Self {
            table: table.into(),
            sequence: sequence.into(),
            current_value,
            increment,
            is_called,
        }
    }
}

/// Largest key stored in a table, or `Empty` when the table has no rows.
///
/// Zero is a legitimate key, so absence of rows is never encoded as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MaxKey {
    Empty,
    Value(i64),
}

impl MaxKey {
    pub fn from_option(v: Option<i64>) -> Self {
        match v {
            Some(v) => MaxKey::Value(v),
            None => MaxKey::Empty,
        }
    }

    pub fn value(self) -> Option<i64> {
        match self {
            MaxKey::Empty => None,
            MaxKey::Value(v) => Some(v),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, MaxKey::Empty)
    }
}

impl fmt::Display for MaxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxKey::Empty => f.write_str("empty"),
            MaxKey::Value(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableKeyStats {
    pub table: String,
    pub max_key: MaxKey,
    /// Smallest stored key; what a descending sequence must stay below.
    pub min_key: MaxKey,
}

impl TableKeyStats {
    /// The stored key furthest along in the direction the sequence draws.
    pub fn leading_key(&self, ascending: bool) -> MaxKey {
        if ascending { self.max_key } else { self.min_key }
    }
}

/// One row of a schema listing: a table and, when it has one, its identity
/// sequence with the state read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInventory {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SequenceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<TableKeyStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
