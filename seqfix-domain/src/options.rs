use std::fmt;
use std::num::NonZeroI64;
use thiserror::Error;

pub const DEFAULT_DATABASE_ALIAS: &str = "default";

/// How the step used for evaluation is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncrementMode {
    /// Step of 1.
    #[default]
    Default,
    /// Operator-supplied step.
    Explicit(NonZeroI64),
    /// Use the increment recorded on each sequence.
    Auto,
}

impl fmt::Display for IncrementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncrementMode::Default => f.write_str("default"),
            IncrementMode::Explicit(step) => write!(f, "{}", step),
            IncrementMode::Auto => f.write_str("auto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableSelection {
    /// Every table in the target schema.
    #[default]
    All,
    /// Explicit names, deduplicated, in request order.
    Named(Vec<String>),
}

/// Validated, immutable options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    increment: IncrementMode,
    min_value: Option<i64>,
    tables: TableSelection,
    dry_run: bool,
    database_alias: String,
}

impl RunOptions {
    pub fn builder() -> RunOptionsBuilder {
        RunOptionsBuilder::default()
    }

    pub fn increment(&self) -> IncrementMode {
        self.increment
    }

    pub fn min_value(&self) -> Option<i64> {
        self.min_value
    }

    pub fn tables(&self) -> &TableSelection {
        &self.tables
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn database_alias(&self) -> &str {
        &self.database_alias
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            increment: IncrementMode::Default,
            min_value: None,
            tables: TableSelection::All,
            dry_run: false,
            database_alias: DEFAULT_DATABASE_ALIAS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("--increment and --auto are mutually exclusive")]
    IncrementConflict,

    #[error("increment must be nonzero")]
    ZeroIncrement,

    #[error("table names must not be empty")]
    EmptyTableName,

    #[error("table list is empty")]
    EmptyTableList,

    #[error("database alias must not be empty")]
    EmptyDatabaseAlias,
}

/// Collects raw option values and checks them once in [`RunOptionsBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RunOptionsBuilder {
    increment: Option<i64>,
    auto: bool,
    min_value: Option<i64>,
    tables: Option<Vec<String>>,
    dry_run: bool,
    database_alias: Option<String>,
}

impl RunOptionsBuilder {
    pub fn increment(mut self, step: Option<i64>) -> Self {
        self.increment = step;
        self
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    pub fn min_value(mut self, floor: Option<i64>) -> Self {
        self.min_value = floor;
        self
    }

    pub fn tables(mut self, tables: Option<Vec<String>>) -> Self {
        self.tables = tables;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn database_alias(mut self, alias: impl Into<String>) -> Self {
        self.database_alias = Some(alias.into());
        self
    }

    pub fn build(self) -> Result<RunOptions, OptionsError> {
        // Checked before anything else so the conflict is reported regardless
        // of other option values.
        let increment = match (self.increment, self.auto) {
            (Some(_), true) => return Err(OptionsError::IncrementConflict),
            (Some(step), false) => {
                IncrementMode::Explicit(NonZeroI64::new(step).ok_or(OptionsError::ZeroIncrement)?)
            }
            (None, true) => IncrementMode::Auto,
            (None, false) => IncrementMode::Default,
        };

        let tables = match self.tables {
            None => TableSelection::All,
            Some(names) => {
                let mut out: Vec<String> = Vec::with_capacity(names.len());
                for name in names {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(OptionsError::EmptyTableName);
                    }
                    if !out.iter().any(|n| n == name) {
                        out.push(name.to_string());
                    }
                }
                if out.is_empty() {
                    return Err(OptionsError::EmptyTableList);
                }
                TableSelection::Named(out)
            }
        };

        let database_alias = match self.database_alias {
            None => DEFAULT_DATABASE_ALIAS.to_string(),
            Some(alias) => {
                let alias = alias.trim();
                if alias.is_empty() {
                    return Err(OptionsError::EmptyDatabaseAlias);
                }
                alias.to_string()
            }
        };

        Ok(RunOptions {
            increment,
            min_value: self.min_value,
            tables,
            dry_run: self.dry_run,
            database_alias,
        })
    }
}

/// Split a comma-separated table list, dropping blank segments.
pub fn parse_table_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_when_nothing_given() {
        let opts = RunOptions::builder().build().expect("build");
        assert_eq!(opts, RunOptions::default());
        assert_eq!(opts.increment(), IncrementMode::Default);
        assert_eq!(opts.database_alias(), "default");
        assert_eq!(opts.tables(), &TableSelection::All);
    }

    #[test]
    fn explicit_increment_and_auto_conflict() {
        let err = RunOptions::builder()
            .increment(Some(-1))
            .auto(true)
            .build()
            .expect_err("conflict");
        assert_eq!(err, OptionsError::IncrementConflict);
    }

    #[test]
    fn conflict_wins_over_other_errors() {
        let err = RunOptions::builder()
            .increment(Some(0))
            .auto(true)
            .tables(Some(vec![" ".to_string()]))
            .database_alias("")
            .build()
            .expect_err("conflict");
        assert_eq!(err, OptionsError::IncrementConflict);
    }

    #[test]
    fn zero_increment_rejected() {
        let err = RunOptions::builder()
            .increment(Some(0))
            .build()
            .expect_err("zero");
        assert_eq!(err, OptionsError::ZeroIncrement);
    }

    #[test]
    fn negative_increment_is_explicit() {
        let opts = RunOptions::builder()
            .increment(Some(-5))
            .build()
            .expect("build");
        assert_eq!(
            opts.increment(),
            IncrementMode::Explicit(NonZeroI64::new(-5).expect("nonzero"))
        );
        assert_eq!(opts.increment().to_string(), "-5");
    }

    #[test]
    fn tables_are_trimmed_and_deduplicated_in_order() {
        let opts = RunOptions::builder()
            .tables(Some(vec![
                "orders".to_string(),
                " items ".to_string(),
                "orders".to_string(),
            ]))
            .build()
            .expect("build");
        assert_eq!(
            opts.tables(),
            &TableSelection::Named(vec!["orders".to_string(), "items".to_string()])
        );
    }

    #[test]
    fn blank_table_name_rejected() {
        let err = RunOptions::builder()
            .tables(Some(vec!["orders".to_string(), "  ".to_string()]))
            .build()
            .expect_err("blank");
        assert_eq!(err, OptionsError::EmptyTableName);

        let err = RunOptions::builder()
            .tables(Some(vec![]))
            .build()
            .expect_err("empty list");
        assert_eq!(err, OptionsError::EmptyTableList);
    }

    #[test]
    fn blank_alias_rejected() {
        let err = RunOptions::builder()
            .database_alias("  ")
            .build()
            .expect_err("blank alias");
        assert_eq!(err, OptionsError::EmptyDatabaseAlias);
    }

    #[test]
    fn parse_table_list_splits_on_commas() {
        assert_eq!(
            parse_table_list("orders, items,,users "),
            vec!["orders", "items", "users"]
        );
        assert!(parse_table_list(" , ").is_empty());
    }
}
