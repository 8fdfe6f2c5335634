//! Audit flags shared by the `seqfix` binary and the acceptance suite.

use camino::Utf8PathBuf;
use clap::{Args, Parser};
use seqfix_core::{DEFAULT_DATABASE_ALIAS, RunOptions, ToolError, parse_table_list};
use std::ffi::OsString;

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// Database alias from seqfix.toml.
    #[arg(long, default_value = DEFAULT_DATABASE_ALIAS)]
    pub database_alias: String,

    /// Connection URL; overrides the alias's configured URL.
    #[arg(long, env = "SEQFIX_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Schema to inspect (default: from config, else public).
    #[arg(long)]
    pub schema: Option<String>,

    /// Config file (default: ./seqfix.toml if present).
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,
}

/// Flags that decide what an audit judges and whether it writes.
#[derive(Debug, Clone, Args)]
pub struct AuditOptionArgs {
    /// Comma-separated list of tables (default: every table in the schema).
    #[arg(long, value_name = "TABLES")]
    pub tables: Option<String>,

    /// Sequence increment to assume; may be negative.
    #[arg(long, allow_negative_numbers = true)]
    pub increment: Option<i64>,

    /// Use the increment recorded on each sequence.
    #[arg(long, default_value_t = false)]
    pub auto: bool,

    /// Minimum value an ascending sequence may hold.
    #[arg(long = "minvalue", value_name = "N", allow_negative_numbers = true)]
    pub min_value: Option<i64>,

    /// Only report broken sequences; never write.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

impl AuditOptionArgs {
    /// Validate into `RunOptions`. Contradictory flags are rejected here,
    /// not by clap, so every surface reports them the same way.
    pub fn run_options(&self) -> Result<RunOptions, ToolError> {
        let options = RunOptions::builder()
            .increment(self.increment)
            .auto(self.auto)
            .min_value(self.min_value)
            .tables(self.tables.as_deref().map(parse_table_list))
            .dry_run(self.dry_run)
            .database_alias(self.db.database_alias.clone())
            .build()?;
        Ok(options)
    }
}

#[derive(Debug, Parser)]
#[command(name = "audit", no_binary_name = true)]
struct AuditFlags {
    #[command(flatten)]
    options: AuditOptionArgs,
}

/// Parse `seqfix audit` flags given without the program name.
pub fn parse_audit_flags<I, T>(args: I) -> Result<AuditOptionArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    AuditFlags::try_parse_from(args).map(|flags| flags.options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use seqfix_core::{IncrementMode, TableSelection};

    #[test]
    fn flags_map_to_options() {
        let args = parse_audit_flags([
            "--tables",
            "orders,items",
            "--increment",
            "-2",
            "--minvalue",
            "10",
            "--dry-run",
        ])
        .unwrap();
        let opts = args.run_options().unwrap();
        assert_eq!(
            opts.tables(),
            &TableSelection::Named(vec!["orders".to_string(), "items".to_string()])
        );
        assert!(matches!(opts.increment(), IncrementMode::Explicit(s) if s.get() == -2));
        assert_eq!(opts.min_value(), Some(10));
        assert!(opts.dry_run());
        assert_eq!(opts.database_alias(), DEFAULT_DATABASE_ALIAS);
    }

    #[test]
    fn no_flags_means_defaults() {
        let opts = parse_audit_flags(Vec::<String>::new())
            .unwrap()
            .run_options()
            .unwrap();
        assert_eq!(opts.tables(), &TableSelection::All);
        assert_eq!(opts.increment(), IncrementMode::Default);
        assert!(!opts.dry_run());
    }

    #[test]
    fn conflicting_flags_parse_but_fail_validation() {
        let args = parse_audit_flags(["--increment", "-1", "--auto"]).unwrap();
        let err = args.run_options().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let err = parse_audit_flags(["--verbose"]).unwrap_err();
        assert!(err.to_string().contains("--verbose"));
    }
}
