use crate::sql;
use anyhow::Context;
use async_trait::async_trait;
use seqfix_core::ports::{CasOutcome, CatalogPort, SequenceReader, SequenceWriter};
use seqfix_types::sequence::{IdentitySequence, MaxKey, SequenceState, TableKeyStats};
use sqlx::PgExecutor;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// A connection pool plus the schema every lookup is scoped to.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
    schema: String,
}

impl PgDatabase {
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Open a pool against `url`.
    ///
    /// Fails if the server cannot be reached; callers treat this as a
    /// configuration error before any table is looked at.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .context("connect to postgres")?;
        Ok(Self::with_pool(pool))
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn sequence_name(&self, target: &IdentitySequence) -> String {
        sql::qualified(&self.schema, &target.sequence)
    }
}

async fn fetch_state<'c>(
    executor: impl PgExecutor<'c>,
    target: &IdentitySequence,
    sequence: &str,
) -> anyhow::Result<SequenceState> {
    let (last_value, is_called, increment): (i64, bool, i64) =
        sqlx::query_as(&sql::read_state(sequence))
            .bind(sequence)
            .fetch_one(executor)
            .await
            .with_context(|| format!("read sequence {}", sequence))?;
    Ok(SequenceState::from_raw(
        target.table.clone(),
        target.sequence.clone(),
        last_value,
        is_called,
        increment,
    ))
}

#[async_trait]
impl CatalogPort for PgDatabase {
    async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        sqlx::query_scalar(sql::LIST_TABLES)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("list tables in schema {}", self.schema))
    }

    async fn table_exists(&self, table: &str) -> anyhow::Result<bool> {
        sqlx::query_scalar(sql::TABLE_EXISTS)
            .bind(&self.schema)
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("look up table {}", table))
    }

    async fn identity_sequence(
        &self,
        table: &str,
        sequence: &str,
    ) -> anyhow::Result<Option<IdentitySequence>> {
        let column: Option<String> = sqlx::query_scalar(sql::IDENTITY_SEQUENCE)
            .bind(&self.schema)
            .bind(table)
            .bind(sequence)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("look up sequence {} of {}", sequence, table))?;
        Ok(column.map(|column| IdentitySequence {
            table: table.to_string(),
            sequence: sequence.to_string(),
            column,
        }))
    }
}

#[async_trait]
impl SequenceReader for PgDatabase {
    async fn read_state(&self, target: &IdentitySequence) -> anyhow::Result<SequenceState> {
        let sequence = self.sequence_name(target);
        fetch_state(&self.pool, target, &sequence).await
    }

    async fn read_max_key(&self, target: &IdentitySequence) -> anyhow::Result<TableKeyStats> {
        let table = sql::qualified(&self.schema, &target.table);
        let (max, min): (Option<i64>, Option<i64>) =
            sqlx::query_as(&sql::key_bounds(&table, &target.column))
                .fetch_one(&self.pool)
                .await
                .with_context(|| format!("read max key of {}", table))?;
        Ok(TableKeyStats {
            table: target.table.clone(),
            max_key: MaxKey::from_option(max),
            min_key: MaxKey::from_option(min),
        })
    }
}

#[async_trait]
impl SequenceWriter for PgDatabase {
    async fn compare_and_set(
        &self,
        target: &IdentitySequence,
        expected: &SequenceState,
        value: i64,
    ) -> anyhow::Result<CasOutcome> {
        let sequence = self.sequence_name(target);
        let mut tx = self.pool.begin().await.context("begin transaction")?;

        // Serializes concurrent seqfix runs on the same sequence.
        sqlx::query(sql::ADVISORY_LOCK)
            .bind(&sequence)
            .execute(&mut *tx)
            .await
            .context("advisory lock")?;

        let applied: Option<i64> = sqlx::query_scalar(&sql::compare_and_set(&sequence))
            .bind(&sequence)
            .bind(value)
            .bind(expected.current_value)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("setval {}", sequence))?;

        let outcome = match applied {
            Some(_) => CasOutcome::Applied,
            None => {
                let fresh = fetch_state(&mut *tx, target, &sequence).await?;
                debug!(
                    sequence = %sequence,
                    expected = expected.current_value,
                    actual = fresh.current_value,
                    "compare-and-set found a moved sequence"
                );
                CasOutcome::Stale(fresh)
            }
        };

        tx.commit().await.context("commit transaction")?;
        Ok(outcome)
    }
}
