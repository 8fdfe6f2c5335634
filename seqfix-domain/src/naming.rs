use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder substituted with the table name.
const PLACEHOLDER: &str = "{table}";

/// Naming convention for identity sequences.
///
/// Only sequences whose name matches the rendered template are audited; any
/// other sequence owned by a table is ignored.
pub const DEFAULT_SEQUENCE_TEMPLATE: &str = "{table}_id_seq";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNameTemplate {
    template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("sequence template '{0}' must contain {{table}} exactly once")]
    Placeholder(String),
}

impl SequenceNameTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        if template.matches(PLACEHOLDER).count() != 1 {
            return Err(TemplateError::Placeholder(template));
        }
        Ok(Self { template })
    }

    pub fn render(&self, table: &str) -> String {
        self.template.replace(PLACEHOLDER, table)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for SequenceNameTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_SEQUENCE_TEMPLATE.to_string(),
        }
    }
}

impl FromStr for SequenceNameTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for SequenceNameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
