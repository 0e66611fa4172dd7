//! Deployment environment tag and the policies that branch on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closed set of deployment environments.
///
/// Unknown tags are rejected at parse time, so every policy below is an
/// exhaustive match rather than a fallback default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// What the orchestration platform does with a resource on stack teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Retain,
    Destroy,
}

/// Capacity envelope for the relational cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCapacity {
    pub min_capacity: u32,
    pub max_capacity: u32,
    /// Idle minutes before the cluster suspends. `None` keeps it warm.
    pub auto_pause_minutes: Option<u32>,
}

/// Idle window after which non-production clusters suspend.
pub const AUTO_PAUSE_MINUTES: u32 = 10;

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Short tag used inside derived resource names.
    pub fn short(&self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Staging => "staging",
            Environment::Production => "prod",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        match self {
            Environment::Production => RemovalPolicy::Retain,
            Environment::Development | Environment::Staging => RemovalPolicy::Destroy,
        }
    }

    pub fn point_in_time_recovery(&self) -> bool {
        self.is_production()
    }

    /// Whether storage objects are emptied on teardown so the bucket can go.
    pub fn auto_delete_objects(&self) -> bool {
        !self.is_production()
    }

    pub fn cluster_capacity(&self) -> ClusterCapacity {
        match self {
            Environment::Development => ClusterCapacity {
                min_capacity: 1,
                max_capacity: 2,
                auto_pause_minutes: Some(AUTO_PAUSE_MINUTES),
            },
            Environment::Staging => ClusterCapacity {
                min_capacity: 1,
                max_capacity: 4,
                auto_pause_minutes: Some(AUTO_PAUSE_MINUTES),
            },
            Environment::Production => ClusterCapacity {
                min_capacity: 2,
                max_capacity: 16,
                auto_pause_minutes: None,
            },
        }
    }

    pub fn log_retention_days(&self) -> u32 {
        match self {
            Environment::Development => 7,
            Environment::Staging => 30,
            Environment::Production => 365,
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let err = "qa".parse::<Environment>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(tag) if tag == "qa"));
    }

    #[test]
    fn production_retains_and_stays_warm() {
        let prod = Environment::Production;
        assert_eq!(prod.removal_policy(), RemovalPolicy::Retain);
        assert_eq!(prod.cluster_capacity().auto_pause_minutes, None);
        assert!(!prod.auto_delete_objects());
    }

    #[test]
    fn non_production_destroys_and_suspends() {
        for env in [Environment::Development, Environment::Staging] {
            assert_eq!(env.removal_policy(), RemovalPolicy::Destroy);
            assert_eq!(
                env.cluster_capacity().auto_pause_minutes,
                Some(AUTO_PAUSE_MINUTES)
            );
        }
    }
}
