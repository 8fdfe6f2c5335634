//! BDD harness (cucumber-rs).
//!
//! Scenario steps drive `seqfix-core` against its in-memory adapter. Audit
//! flags in step text go through the same clap parser as `seqfix audit`.

use anyhow::Context;
use seqfix_cli::args::parse_audit_flags;
use seqfix_core::RunOptions;

/// Parse a comma-separated key list such as `1, 500, 1042`. Blank means no rows.
pub fn parse_keys(raw: &str) -> anyhow::Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().with_context(|| format!("invalid key '{}'", s)))
        .collect()
}

/// Build options from flags such as `--tables orders --increment -1 --dry-run`.
/// The `Err` string is what a user would see.
pub fn options_from_flags(flags: &str) -> Result<RunOptions, String> {
    let args = parse_audit_flags(flags.split_whitespace()).map_err(|e| e.to_string())?;
    args.run_options().map_err(|e| e.to_string())
}
