//! Error types for stack configuration and composition.

use thiserror::Error;

/// Result type alias for configuration and composition operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal configuration errors. Composition aborts on the first one.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown environment tag: {0:?} (expected development, staging, or production)")]
    UnknownEnvironment(String),

    #[error("invalid project name {0:?}: must be non-empty lowercase alphanumerics and dashes, starting with a letter")]
    InvalidProjectName(String),

    #[error("data tier {tier} declared but its {section} section is missing")]
    MissingTierSpec {
        tier: &'static str,
        section: &'static str,
    },

    #[error("wrong data tier accessor: requested {requested}, active tier is {active}")]
    WrongTier {
        requested: &'static str,
        active: &'static str,
    },

    #[error("invalid table name {0:?}: must start with a letter and contain only alphanumerics, underscores, and dashes")]
    InvalidTableName(String),

    #[error("table {table:?} collides with {other:?}: both derive {derived}")]
    DuplicateTable {
        table: String,
        other: String,
        derived: String,
    },

    #[error("invalid route name {0:?}: must be non-empty lowercase alphanumerics and dashes, starting with a letter")]
    InvalidRouteName(String),

    #[error("duplicate route name: {0}")]
    DuplicateRouteName(String),

    #[error("duplicate route registration: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    #[error("invalid route path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid compute budget: {0}")]
    InvalidBudget(String),

    #[error("duplicate resource logical id: {0}")]
    DuplicateResource(String),

    #[error("conflicting values for output {0}")]
    OutputConflict(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to render configuration: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Render(err.to_string())
    }
}
