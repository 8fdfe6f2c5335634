//! Configuration file loading for seqfix.
//!
//! Discovers and loads `seqfix.toml` from the working directory (or an
//! explicit path), then merges it with CLI arguments. CLI takes precedence.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use seqfix_core::settings::{DEFAULT_JOBS, DEFAULT_REPAIR_ATTEMPTS};
use seqfix_core::{ConfigError, DEFAULT_DATABASE_ALIAS, SequenceNameTemplate};
use seqfix_pg::{DEFAULT_MAX_CONNECTIONS, DEFAULT_SCHEMA};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "seqfix.toml";

/// Alias that may fall back to `DATABASE_URL`.
pub const DEFAULT_ALIAS: &str = DEFAULT_DATABASE_ALIAS;

/// Top-level configuration from seqfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeqfixConfig {
    /// Connection settings keyed by alias.
    pub databases: BTreeMap<String, DatabaseConfig>,

    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub schema: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Sequence naming convention, e.g. `{table}_id_seq`.
    pub sequence_template: Option<String>,

    /// Tables audited concurrently.
    pub jobs: Option<usize>,

    /// Compare-and-set attempts before a repair is reported as failed.
    pub repair_attempts: Option<u32>,
}

/// Look for `seqfix.toml` in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<SeqfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<SeqfixConfig> {
    let config: SeqfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config if given (it must exist), else discover one in
/// `dir`, else return defaults.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<SeqfixConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(SeqfixConfig::default()),
    }
}

/// Connection and execution values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_alias: String,
    /// `--database-url` or `SEQFIX_DATABASE_URL`.
    pub database_url: Option<String>,
    pub schema: Option<String>,
    pub jobs: Option<usize>,
}

/// Effective settings after merging the file with CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub database_url: String,
    pub schema: String,
    pub max_connections: u32,
    pub sequence_template: SequenceNameTemplate,
    pub jobs: usize,
    pub repair_attempts: u32,
}

pub struct ConfigMerger {
    config: SeqfixConfig,
}

impl ConfigMerger {
    pub fn new(config: SeqfixConfig) -> Self {
        Self { config }
    }

    /// Resolve the alias to a connection and fill in execution defaults.
    ///
    /// `env_database_url` is the value of `DATABASE_URL`; it is only consulted
    /// for the default alias. An alias that is neither configured nor given a
    /// URL on the command line is an error.
    pub fn merge(
        self,
        cli: &CliOverrides,
        env_database_url: Option<String>,
    ) -> Result<MergedConfig, ConfigError> {
        let alias = cli.database_alias.as_str();
        let db = self.config.databases.get(alias);

        if db.is_none() && cli.database_url.is_none() && alias != DEFAULT_ALIAS {
            return Err(ConfigError::UnknownDatabaseAlias(alias.to_string()));
        }

        let database_url = cli
            .database_url
            .clone()
            .or_else(|| db.and_then(|d| d.url.clone()))
            .or_else(|| {
                if alias == DEFAULT_ALIAS {
                    env_database_url
                } else {
                    None
                }
            })
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingDatabaseUrl(alias.to_string()))?;

        let schema = cli
            .schema
            .clone()
            .or_else(|| db.and_then(|d| d.schema.clone()))
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        if schema.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("schema must not be empty".to_string()));
        }

        let max_connections = db
            .and_then(|d| d.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "databases.{alias}.max_connections must be at least 1"
            )));
        }

        let audit = &self.config.audit;
        let sequence_template = match &audit.sequence_template {
            Some(t) => SequenceNameTemplate::new(t.clone())?,
            None => SequenceNameTemplate::default(),
        };

        let jobs = cli.jobs.or(audit.jobs).unwrap_or(DEFAULT_JOBS);
        if jobs == 0 {
            return Err(ConfigError::InvalidConfig("jobs must be at least 1".to_string()));
        }

        let repair_attempts = audit.repair_attempts.unwrap_or(DEFAULT_REPAIR_ATTEMPTS);
        if repair_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "audit.repair_attempts must be at least 1".to_string(),
            ));
        }

        Ok(MergedConfig {
            database_url,
            schema,
            max_connections,
            sequence_template,
            jobs,
            repair_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn overrides(alias: &str) -> CliOverrides {
        CliOverrides {
            database_alias: alias.to_string(),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_parse_example_config() {
        let contents = r#"
[databases.default]
url = "postgres://app@localhost/app"
schema = "public"
max_connections = 8

[databases.reporting]
url = "postgres://ro@replica/app"
schema = "reporting"

[audit]
sequence_template = "{table}_id_seq"
jobs = 2
repair_attempts = 5
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.databases.len(), 2);
        assert_eq!(config.databases["default"].max_connections, Some(8));
        assert_eq!(
            config.databases["reporting"].schema.as_deref(),
            Some("reporting")
        );
        assert_eq!(config.audit.jobs, Some(2));
        assert_eq!(config.audit.repair_attempts, Some(5));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.databases.is_empty());
        assert!(config.audit.sequence_template.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_config("[audit]\njbos = 2\n").unwrap_err();
        assert!(format!("{err:#}").contains("jbos"));
    }

    #[test]
    fn test_merge_uses_file_values() {
        let config = parse_config(
            r#"
[databases.default]
url = "postgres://file/app"
schema = "app"
max_connections = 2

[audit]
sequence_template = "{table}_pk_seq"
jobs = 3
"#,
        )
        .unwrap();

        let merged = ConfigMerger::new(config)
            .merge(&overrides("default"), Some("postgres://env/app".to_string()))
            .unwrap();
        assert_eq!(merged.database_url, "postgres://file/app");
        assert_eq!(merged.schema, "app");
        assert_eq!(merged.max_connections, 2);
        assert_eq!(merged.sequence_template.render("orders"), "orders_pk_seq");
        assert_eq!(merged.jobs, 3);
        assert_eq!(merged.repair_attempts, DEFAULT_REPAIR_ATTEMPTS);
    }

    #[test]
    fn test_merge_cli_overrides_file() {
        let config = parse_config(
            r#"
[databases.default]
url = "postgres://file/app"
schema = "app"

[audit]
jobs = 3
"#,
        )
        .unwrap();

        let cli = CliOverrides {
            database_alias: "default".to_string(),
            database_url: Some("postgres://cli/app".to_string()),
            schema: Some("other".to_string()),
            jobs: Some(8),
        };
        let merged = ConfigMerger::new(config).merge(&cli, None).unwrap();
        assert_eq!(merged.database_url, "postgres://cli/app");
        assert_eq!(merged.schema, "other");
        assert_eq!(merged.jobs, 8);
    }

    #[test]
    fn test_default_alias_falls_back_to_env() {
        let merged = ConfigMerger::new(SeqfixConfig::default())
            .merge(&overrides("default"), Some("postgres://env/app".to_string()))
            .unwrap();
        assert_eq!(merged.database_url, "postgres://env/app");
        assert_eq!(merged.schema, DEFAULT_SCHEMA);
        assert_eq!(merged.jobs, DEFAULT_JOBS);
    }

    #[test]
    fn test_default_alias_without_any_url_fails() {
        let err = ConfigMerger::new(SeqfixConfig::default())
            .merge(&overrides("default"), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl(ref a) if a == "default"));
    }

    #[test]
    fn test_unknown_alias_fails() {
        let err = ConfigMerger::new(SeqfixConfig::default())
            .merge(&overrides("warehouse"), Some("postgres://env/app".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown database alias 'warehouse'");
    }

    #[test]
    fn test_named_alias_ignores_env_url() {
        let config = parse_config("[databases.reporting]\nschema = \"r\"\n").unwrap();
        let err = ConfigMerger::new(config)
            .merge(&overrides("reporting"), Some("postgres://env/app".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl(ref a) if a == "reporting"));
    }

    #[test]
    fn test_bad_template_and_zero_values_rejected() {
        let config = parse_config("[audit]\nsequence_template = \"static_seq\"\n").unwrap();
        let err = ConfigMerger::new(config)
            .merge(&overrides("default"), Some("postgres://x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTemplate(_)));

        let config = parse_config("[audit]\njobs = 0\n").unwrap();
        let err = ConfigMerger::new(config)
            .merge(&overrides("default"), Some("postgres://x".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("jobs must be at least 1"));
    }

    #[test]
    fn test_discover_config_some_and_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write config");
        assert!(discover_config(&root).is_some());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let missing = root.join("nope.toml");
        assert!(load_or_default(Some(&missing), &root).is_err());

        let cfg = load_or_default(None, &root).expect("load default");
        assert!(cfg.databases.is_empty());
    }
}
