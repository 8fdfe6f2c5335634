//! In-memory port implementations for embedding and testing.

use crate::ports::{CasOutcome, CatalogPort, SequenceReader, SequenceWriter};
use async_trait::async_trait;
use seqfix_types::sequence::{IdentitySequence, MaxKey, SequenceState, TableKeyStats};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone)]
struct MemSequence {
    name: String,
    column: String,
    last_value: i64,
    is_called: bool,
    increment: i64,
}

impl MemSequence {
    fn state(&self, table: &str) -> SequenceState {
        SequenceState::from_raw(
            table,
            self.name.clone(),
            self.last_value,
            self.is_called,
            self.increment,
        )
    }

    fn nextval(&mut self) -> i64 {
        if self.is_called {
            self.last_value += self.increment;
        } else {
            self.is_called = true;
        }
        self.last_value
    }
}

#[derive(Debug, Clone, Default)]
struct MemTable {
    keys: Vec<i64>,
    sequences: Vec<MemSequence>,
}

/// Something another session does to a sequence between our read and our write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interference {
    /// Draw from the sequence this many times.
    NextVal(u32),
    /// Set the sequence outright.
    SetVal(i64),
    /// Set the sequence and change its increment, like `ALTER SEQUENCE`.
    Redefine { value: i64, increment: i64 },
}

#[derive(Debug, Default)]
struct MemState {
    tables: BTreeMap<String, MemTable>,
    failing_reads: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
    interference: BTreeMap<String, VecDeque<Interference>>,
    writes: u64,
}

impl MemState {
    fn sequence_mut(&mut self, target: &IdentitySequence) -> anyhow::Result<&mut MemSequence> {
        self.tables
            .get_mut(&target.table)
            .and_then(|t| t.sequences.iter_mut().find(|s| s.name == target.sequence))
            .ok_or_else(|| anyhow::anyhow!("sequence {} does not exist", target.sequence))
    }
}

/// A database held in memory: tables with keys, each optionally owning sequences.
///
/// Supports injected read/write failures and scripted concurrent writers so the
/// pipeline's isolation and compare-and-set paths can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    inner: Mutex<MemState>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a table holding `keys`.
    pub fn add_table(&self, table: &str, keys: impl IntoIterator<Item = i64>) {
        let mut state = self.lock();
        let entry = state.tables.entry(table.to_string()).or_default();
        entry.keys = keys.into_iter().collect();
    }

    /// Attach a sequence that has been drawn from and holds `last_value`.
    pub fn add_sequence(
        &self,
        table: &str,
        sequence: &str,
        column: &str,
        last_value: i64,
        increment: i64,
    ) {
        self.add_sequence_raw(table, sequence, column, last_value, true, increment);
    }

    pub fn add_sequence_raw(
        &self,
        table: &str,
        sequence: &str,
        column: &str,
        last_value: i64,
        is_called: bool,
        increment: i64,
    ) {
        let mut state = self.lock();
        let entry = state.tables.entry(table.to_string()).or_default();
        entry.sequences.retain(|s| s.name != sequence);
        entry.sequences.push(MemSequence {
            name: sequence.to_string(),
            column: column.to_string(),
            last_value,
            is_called,
            increment,
        });
    }

    pub fn insert_keys(&self, table: &str, keys: impl IntoIterator<Item = i64>) {
        let mut state = self.lock();
        if let Some(t) = state.tables.get_mut(table) {
            t.keys.extend(keys);
        }
    }

    /// Effective current value of `sequence`, if it exists.
    pub fn sequence_value(&self, table: &str, sequence: &str) -> Option<i64> {
        let state = self.lock();
        state
            .tables
            .get(table)
            .and_then(|t| t.sequences.iter().find(|s| s.name == sequence))
            .map(|s| s.state(table).current_value)
    }

    /// Number of successful sequence writes so far.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    pub fn fail_reads(&self, table: &str) {
        self.lock().failing_reads.insert(table.to_string());
    }

    pub fn fail_writes(&self, table: &str) {
        self.lock().failing_writes.insert(table.to_string());
    }

    /// Queue an interference applied at the start of the next write to `table`.
    pub fn interfere(&self, table: &str, action: Interference) {
        self.lock()
            .interference
            .entry(table.to_string())
            .or_default()
            .push_back(action);
    }
}

#[async_trait]
impl CatalogPort for InMemoryDatabase {
    async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.lock().tables.keys().cloned().collect())
    }

    async fn table_exists(&self, table: &str) -> anyhow::Result<bool> {
        Ok(self.lock().tables.contains_key(table))
    }

    async fn identity_sequence(
        &self,
        table: &str,
        sequence: &str,
    ) -> anyhow::Result<Option<IdentitySequence>> {
        let state = self.lock();
        Ok(state.tables.get(table).and_then(|t| {
            t.sequences
                .iter()
                .find(|s| s.name == sequence)
                .map(|s| IdentitySequence {
                    table: table.to_string(),
                    sequence: s.name.clone(),
                    column: s.column.clone(),
                })
        }))
    }
}

#[async_trait]
impl SequenceReader for InMemoryDatabase {
    async fn read_state(&self, target: &IdentitySequence) -> anyhow::Result<SequenceState> {
        let mut state = self.lock();
        if state.failing_reads.contains(&target.table) {
            anyhow::bail!("injected read failure for {}", target.table);
        }
        let seq = state.sequence_mut(target)?;
        Ok(seq.state(&target.table))
    }

    async fn read_max_key(&self, target: &IdentitySequence) -> anyhow::Result<TableKeyStats> {
        let state = self.lock();
        if state.failing_reads.contains(&target.table) {
            anyhow::bail!("injected read failure for {}", target.table);
        }
        let table = state
            .tables
            .get(&target.table)
            .ok_or_else(|| anyhow::anyhow!("table {} does not exist", target.table))?;
        Ok(TableKeyStats {
            table: target.table.clone(),
            max_key: MaxKey::from_option(table.keys.iter().copied().max()),
            min_key: MaxKey::from_option(table.keys.iter().copied().min()),
        })
    }
}

#[async_trait]
impl SequenceWriter for InMemoryDatabase {
    async fn compare_and_set(
        &self,
        target: &IdentitySequence,
        expected: &SequenceState,
        value: i64,
    ) -> anyhow::Result<CasOutcome> {
        let mut state = self.lock();

        let pending = state
            .interference
            .get_mut(&target.table)
            .and_then(VecDeque::pop_front);
        if let Some(action) = pending {
            debug!(table = %target.table, ?action, "applying scripted interference");
            let seq = state.sequence_mut(target)?;
            match action {
                Interference::NextVal(n) => {
                    for _ in 0..n {
                        seq.nextval();
                    }
                }
                Interference::SetVal(v) => {
                    seq.last_value = v;
                    seq.is_called = true;
                }
                Interference::Redefine { value, increment } => {
                    seq.last_value = value;
                    seq.is_called = true;
                    seq.increment = increment;
                }
            }
        }

        if state.failing_writes.contains(&target.table) {
            anyhow::bail!("injected write failure for {}", target.table);
        }

        let seq = state.sequence_mut(target)?;
        let current = seq.state(&target.table);
        if current.current_value != expected.current_value {
            return Ok(CasOutcome::Stale(current));
        }
        seq.last_value = value;
        seq.is_called = true;
        state.writes += 1;
        Ok(CasOutcome::Applied)
    }
}
