//! blueprint.toml configuration parser.
//!
//! [`StackConfig`] is the immutable snapshot the composition engine runs
//! against. It is loaded once, optionally overridden by the caller, and
//! validated before any resource is declared.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use convert_case::{Case, Casing};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{ConfigError, ConfigResult};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("valid name regex"));
static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid table name regex"));
static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{[A-Za-z_][A-Za-z0-9_]*\}$").expect("valid param regex"));
static LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid segment regex"));

/// Platform bounds for a compute unit.
pub const MIN_TIMEOUT_SECS: u32 = 1;
pub const MAX_TIMEOUT_SECS: u32 = 900;
pub const MIN_MEMORY_MB: u32 = 128;
pub const MAX_MEMORY_MB: u32 = 10_240;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub project: ProjectConfig,
    pub data: DataConfig,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub compute: ComputeBudget,
    #[serde(default)]
    pub assets: AssetsConfig,
    /// Presence alone turns the dashboard on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Data tier ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Keyed,
    Relational,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Keyed => "keyed",
            TierKind::Relational => "relational",
        }
    }
}

/// Tagged data tier section. `kind` selects which sub-section is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub kind: TierKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Passed through verbatim; names are assumed unique per table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
}

impl TableSpec {
    /// Logical id of the declared table, e.g. `UserProfilesTable`.
    pub fn logical_id(&self) -> String {
        format!("{}Table", self.name.to_case(Case::Pascal))
    }

    /// Environment variable carrying the physical table name, e.g. `USER_PROFILES_TABLE`.
    pub fn env_key(&self) -> String {
        format!("{}_TABLE", self.name.to_case(Case::UpperSnake))
    }

    fn validate(&self) -> ConfigResult<()> {
        if !TABLE_NAME_RE.is_match(&self.name) {
            return Err(ConfigError::InvalidTableName(self.name.clone()));
        }
        Ok(())
    }
}

/// Two table names that differ only in case or separators derive the same
/// logical id or env key.
fn check_table_names(tables: &[TableSpec]) -> ConfigResult<()> {
    let mut ids: HashMap<String, &str> = HashMap::new();
    let mut keys: HashMap<String, &str> = HashMap::new();
    for table in tables {
        table.validate()?;
        for (seen, derived) in [(&mut ids, table.logical_id()), (&mut keys, table.env_key())] {
            if let Some(other) = seen.get(&derived) {
                return Err(ConfigError::DuplicateTable {
                    table: table.name.clone(),
                    other: other.to_string(),
                    derived,
                });
            }
            seen.insert(derived, &table.name);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub database_name: String,
    pub admin_username: String,
    pub dialect: Dialect,
    #[serde(default)]
    pub http_endpoint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Mysql,
    Postgresql,
}

impl Dialect {
    pub fn engine(&self) -> &'static str {
        match self {
            Dialect::Mysql => "aurora-mysql",
            Dialect::Postgresql => "aurora-postgresql",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::Mysql => 3306,
            Dialect::Postgresql => 5432,
        }
    }
}

/// Resolved data tier: exactly one variant, borrowed from the config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataTierSpec<'a> {
    Keyed(&'a [TableSpec]),
    Relational(&'a ClusterSpec),
}

impl DataConfig {
    /// Table list of the keyed tier.
    ///
    /// Fails if the relational tier is active or the table list is absent.
    pub fn tables(&self) -> ConfigResult<&[TableSpec]> {
        match self.kind {
            TierKind::Keyed => match self.tables.as_deref() {
                Some(tables) if !tables.is_empty() => Ok(tables),
                _ => Err(ConfigError::MissingTierSpec {
                    tier: TierKind::Keyed.as_str(),
                    section: "data.tables",
                }),
            },
            TierKind::Relational => Err(ConfigError::WrongTier {
                requested: TierKind::Keyed.as_str(),
                active: TierKind::Relational.as_str(),
            }),
        }
    }

    /// Cluster section of the relational tier.
    pub fn cluster(&self) -> ConfigResult<&ClusterSpec> {
        match self.kind {
            TierKind::Relational => self.cluster.as_ref().ok_or(ConfigError::MissingTierSpec {
                tier: TierKind::Relational.as_str(),
                section: "data.cluster",
            }),
            TierKind::Keyed => Err(ConfigError::WrongTier {
                requested: TierKind::Relational.as_str(),
                active: TierKind::Keyed.as_str(),
            }),
        }
    }

    pub fn resolve(&self) -> ConfigResult<DataTierSpec<'_>> {
        match self.kind {
            TierKind::Keyed => self.tables().map(DataTierSpec::Keyed),
            TierKind::Relational => self.cluster().map(DataTierSpec::Relational),
        }
    }
}

// ── Routes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compute unit bound to one method + path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub name: String,
    pub method: HttpMethod,
    /// Path template, e.g. `/items/{id}`. At most one parameter segment.
    pub path: String,
}

impl RouteSpec {
    pub fn new(name: &str, method: HttpMethod, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
        }
    }

    /// Non-empty path segments; the root path yields none.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Canonical form used for duplicate detection.
    pub fn normalized_path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    fn validate(&self) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidPath {
            path: self.path.clone(),
            reason: reason.to_string(),
        };

        if !self.path.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if self.path.contains("//") {
            return Err(invalid("empty segment"));
        }

        let mut params = 0;
        for segment in self.segments() {
            if segment.starts_with('{') {
                if !PARAM_RE.is_match(segment) {
                    return Err(invalid("malformed parameter segment"));
                }
                params += 1;
            } else if !LITERAL_RE.is_match(segment) {
                return Err(invalid("unsupported characters in segment"));
            }
        }
        if params > 1 {
            return Err(invalid("at most one parameter segment is allowed"));
        }
        Ok(())
    }
}

/// The fixed route catalog used when `[[routes]]` is omitted.
pub fn default_routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new("list-items", HttpMethod::Get, "/items"),
        RouteSpec::new("get-item", HttpMethod::Get, "/items/{id}"),
        RouteSpec::new("create-item", HttpMethod::Post, "/items"),
        RouteSpec::new("update-item", HttpMethod::Put, "/items/{id}"),
        RouteSpec::new("delete-item", HttpMethod::Delete, "/items/{id}"),
        RouteSpec::new("get-user", HttpMethod::Get, "/users/{userId}"),
        RouteSpec::new("create-user", HttpMethod::Post, "/users"),
        RouteSpec::new("health", HttpMethod::Get, "/health"),
    ]
}

// ── Compute ───────────────────────────────────────────────────────

/// Budget shared by every compute unit. No per-unit override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeBudget {
    pub timeout_secs: u32,
    pub memory_mb: u32,
    pub runtime: String,
    pub code_path: String,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            memory_mb: 256,
            runtime: "nodejs20.x".to_string(),
            code_path: "dist".to_string(),
        }
    }
}

impl ComputeBudget {
    fn validate(&self) -> ConfigResult<()> {
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidBudget(format!(
                "timeout {}s outside {MIN_TIMEOUT_SECS}..={MAX_TIMEOUT_SECS}",
                self.timeout_secs
            )));
        }
        if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&self.memory_mb) {
            return Err(ConfigError::InvalidBudget(format!(
                "memory {}MB outside {MIN_MEMORY_MB}..={MAX_MEMORY_MB}",
                self.memory_mb
            )));
        }
        if self.runtime.trim().is_empty() {
            return Err(ConfigError::InvalidBudget("runtime must be set".to_string()));
        }
        Ok(())
    }
}

// ── Assets ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Serve the storage bucket as a website.
    pub hosting: bool,
    /// Put a global distribution in front of the bucket.
    pub distribution: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<CustomDomain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDomain {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_arn: Option<String>,
}

// ── Observability ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_name: Option<String>,
    /// Metric period in seconds.
    #[serde(default = "default_period_secs")]
    pub period_secs: u32,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            dashboard_name: None,
            period_secs: default_period_secs(),
        }
    }
}

fn default_period_secs() -> u32 {
    300
}

// ── Loading ───────────────────────────────────────────────────────

impl StackConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn environment(&self) -> Environment {
        self.project.environment
    }

    /// Check the snapshot's own invariants. Platform-level constraints
    /// (global name uniqueness, quotas) are left to the platform.
    pub fn validate(&self) -> ConfigResult<()> {
        if !NAME_RE.is_match(&self.project.name) {
            return Err(ConfigError::InvalidProjectName(self.project.name.clone()));
        }

        if let DataTierSpec::Keyed(tables) = self.data.resolve()? {
            check_table_names(tables)?;
        }

        let mut names = HashSet::new();
        for route in &self.routes {
            if !NAME_RE.is_match(&route.name) {
                return Err(ConfigError::InvalidRouteName(route.name.clone()));
            }
            if !names.insert(route.name.as_str()) {
                return Err(ConfigError::DuplicateRouteName(route.name.clone()));
            }
            route.validate()?;
        }

        self.compute.validate()
    }

    /// Scaffold a minimal blueprint.toml for the given data tier.
    pub fn scaffold(name: &str, environment: Environment, kind: TierKind) -> Self {
        let data = match kind {
            TierKind::Keyed => DataConfig {
                kind,
                tables: Some(vec![
                    TableSpec {
                        name: "Users".to_string(),
                        partition_key: "userId".to_string(),
                        sort_key: None,
                        indexes: vec![IndexSpec {
                            name: "email-index".to_string(),
                            partition_key: "email".to_string(),
                            sort_key: None,
                        }],
                    },
                    TableSpec {
                        name: "Items".to_string(),
                        partition_key: "id".to_string(),
                        sort_key: Some("createdAt".to_string()),
                        indexes: vec![],
                    },
                ]),
                cluster: None,
            },
            TierKind::Relational => DataConfig {
                kind,
                tables: None,
                cluster: Some(ClusterSpec {
                    database_name: "app".to_string(),
                    admin_username: "app_admin".to_string(),
                    dialect: Dialect::Postgresql,
                    http_endpoint: true,
                }),
            },
        };

        StackConfig {
            project: ProjectConfig {
                name: name.to_string(),
                environment,
                description: None,
            },
            data,
            routes: default_routes(),
            compute: ComputeBudget::default(),
            assets: AssetsConfig {
                hosting: true,
                distribution: true,
                domain: None,
            },
            observability: Some(ObservabilityConfig::default()),
        }
    }
}
