//! Port traits abstracting all database access away from the pipeline.

use async_trait::async_trait;
use seqfix_types::sequence::{IdentitySequence, SequenceState, TableKeyStats};

/// Read-only catalog queries.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Every table in the target schema, sorted by name.
    async fn list_tables(&self) -> anyhow::Result<Vec<String>>;

    async fn table_exists(&self, table: &str) -> anyhow::Result<bool>;

    /// The sequence named `sequence` if it is owned by a primary key column of `table`.
    async fn identity_sequence(
        &self,
        table: &str,
        sequence: &str,
    ) -> anyhow::Result<Option<IdentitySequence>>;

    async fn table_has_identity_sequence(
        &self,
        table: &str,
        sequence: &str,
    ) -> anyhow::Result<bool> {
        Ok(self.identity_sequence(table, sequence).await?.is_some())
    }
}

/// Fresh reads of sequence metadata and table keys. Nothing is cached.
#[async_trait]
pub trait SequenceReader: Send + Sync {
    async fn read_state(&self, target: &IdentitySequence) -> anyhow::Result<SequenceState>;

    async fn read_max_key(&self, target: &IdentitySequence) -> anyhow::Result<TableKeyStats>;
}

/// Result of a conditional sequence write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The sequence no longer matched the expected state; carries what it holds now.
    Stale(SequenceState),
}

#[async_trait]
pub trait SequenceWriter: Send + Sync {
    /// Set the sequence to `value` only if it still holds `expected.current_value`.
    ///
    /// Only sequence metadata is touched, never table rows.
    async fn compare_and_set(
        &self,
        target: &IdentitySequence,
        expected: &SequenceState,
        value: i64,
    ) -> anyhow::Result<CasOutcome>;
}
