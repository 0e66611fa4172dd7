//! Declarative resource graph.
//!
//! Every component of the composition engine appends resources to one
//! [`ResourceGraph`]. Resources are plain descriptions; the orchestration
//! platform diffs and applies them.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::HttpMethod;
use crate::environment::RemovalPolicy;
use crate::error::{ConfigError, ConfigResult};
use crate::token::{ResourceRef, Token};

/// A single declared resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(skip)]
    pub id: String,
    #[serde(flatten)]
    pub props: ResourceProps,
    /// Logical ids this resource must be created after.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum ResourceProps {
    Table(TableProps),
    Network(NetworkProps),
    Secret(SecretProps),
    Cluster(ClusterProps),
    Role(RoleProps),
    Function(FunctionProps),
    Api(ApiProps),
    ApiPath(ApiPathProps),
    ApiMethod(ApiMethodProps),
    Bucket(BucketProps),
    AccessIdentity(AccessIdentityProps),
    Certificate(CertificateProps),
    Distribution(DistributionProps),
    AssetDeployment(AssetDeploymentProps),
    Dashboard(DashboardProps),
}

impl ResourceProps {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceProps::Table(_) => "table",
            ResourceProps::Network(_) => "network",
            ResourceProps::Secret(_) => "secret",
            ResourceProps::Cluster(_) => "cluster",
            ResourceProps::Role(_) => "role",
            ResourceProps::Function(_) => "function",
            ResourceProps::Api(_) => "api",
            ResourceProps::ApiPath(_) => "api_path",
            ResourceProps::ApiMethod(_) => "api_method",
            ResourceProps::Bucket(_) => "bucket",
            ResourceProps::AccessIdentity(_) => "access_identity",
            ResourceProps::Certificate(_) => "certificate",
            ResourceProps::Distribution(_) => "distribution",
            ResourceProps::AssetDeployment(_) => "asset_deployment",
            ResourceProps::Dashboard(_) => "dashboard",
        }
    }

    /// Every token embedded in the properties.
    fn tokens(&self) -> Vec<&Token> {
        match self {
            ResourceProps::Cluster(p) => vec![&p.credentials, &p.network],
            ResourceProps::Role(p) => p.statements.iter().flat_map(|s| s.resources.iter()).collect(),
            ResourceProps::Function(p) => {
                let mut tokens = vec![&p.role];
                tokens.extend(p.environment.values());
                tokens
            }
            ResourceProps::ApiPath(p) => vec![&p.api, &p.parent],
            ResourceProps::ApiMethod(p) => vec![&p.api, &p.resource, &p.integration],
            ResourceProps::Bucket(p) => match &p.access {
                BucketAccess::DistributionOnly { identity } => vec![identity],
                BucketAccess::Private | BucketAccess::PublicRead => vec![],
            },
            ResourceProps::Distribution(p) => {
                let mut tokens = vec![&p.origin_bucket, &p.origin_identity];
                tokens.extend(p.certificate.iter());
                tokens
            }
            ResourceProps::AssetDeployment(p) => {
                let mut tokens = vec![&p.bucket];
                tokens.extend(p.invalidate.iter());
                tokens
            }
            ResourceProps::Dashboard(p) => p
                .widgets
                .iter()
                .flat_map(|w| w.metrics.iter())
                .flat_map(|m| m.dimensions.values())
                .collect(),
            ResourceProps::Table(_)
            | ResourceProps::Network(_)
            | ResourceProps::Secret(_)
            | ResourceProps::Api(_)
            | ResourceProps::AccessIdentity(_)
            | ResourceProps::Certificate(_) => vec![],
        }
    }
}

// ── Data tier ─────────────────────────────────────────────────────

/// Keyed table. Key attributes are string-typed; billing is on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProps {
    pub table_name: String,
    pub partition_key: String,
    pub sort_key: Option<String>,
    pub point_in_time_recovery: bool,
    pub removal_policy: RemovalPolicy,
    pub secondary_indexes: Vec<SecondaryIndex>,
}

/// Global secondary index, projecting all attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecondaryIndex {
    pub index_name: String,
    pub partition_key: String,
    pub sort_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkProps {
    pub name: String,
    pub max_azs: u32,
    pub nat_gateways: u32,
    pub isolated_subnets: bool,
}

/// Credential secret whose password the platform generates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretProps {
    pub secret_name: String,
    pub username: String,
    pub password_length: u32,
    pub exclude_characters: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProps {
    pub cluster_identifier: String,
    pub engine: String,
    pub port: u16,
    pub default_database_name: String,
    pub credentials: Token,
    pub network: Token,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub auto_pause_minutes: Option<u32>,
    pub http_endpoint: bool,
    pub removal_policy: RemovalPolicy,
}

// ── Compute ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleProps {
    pub role_name: String,
    pub assumed_by: String,
    pub managed_policies: Vec<String>,
    pub statements: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionProps {
    pub function_name: String,
    pub runtime: String,
    pub handler: String,
    pub code_path: String,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub role: Token,
    pub environment: BTreeMap<String, Token>,
    pub log_retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiProps {
    pub api_name: String,
    pub stage_name: String,
    pub cors_allow_origins: Vec<String>,
    pub cors_allow_methods: Vec<String>,
}

/// One path segment under the API root or another segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiPathProps {
    pub api: Token,
    pub parent: Token,
    pub path_part: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiMethodProps {
    pub api: Token,
    pub resource: Token,
    pub http_method: HttpMethod,
    pub path: String,
    pub integration: Token,
}

// ── Assets ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BucketAccess {
    /// No public path at all.
    Private,
    /// Direct anonymous read of objects.
    PublicRead,
    /// Private; readable only through the distribution's delegated identity.
    DistributionOnly { identity: Token },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebsiteConfig {
    pub index_document: String,
    pub error_document: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketProps {
    pub bucket_name: String,
    pub access: BucketAccess,
    pub website: Option<WebsiteConfig>,
    pub removal_policy: RemovalPolicy,
    pub auto_delete_objects: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessIdentityProps {
    pub comment: String,
}

/// Reference to an externally issued certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateProps {
    pub certificate_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub http_status: u16,
    pub response_status: u16,
    pub response_page_path: String,
    pub ttl_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionProps {
    pub comment: String,
    pub origin_bucket: Token,
    pub origin_identity: Token,
    pub default_root_object: String,
    pub viewer_protocol_policy: String,
    pub error_responses: Vec<ErrorResponse>,
    pub domain_names: Vec<String>,
    pub certificate: Option<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetDeploymentProps {
    pub bucket: Token,
    pub key: String,
    pub content_type: String,
    pub content_sha256: String,
    pub size_bytes: usize,
    /// Distribution whose cache is invalidated after upload.
    pub invalidate: Option<Token>,
}

// ── Observability ─────────────────────────────────────────────────

/// Reference to a metric published by the observability backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRef {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: BTreeMap<String, Token>,
    pub statistic: String,
}

impl MetricRef {
    pub fn new(namespace: &str, metric_name: &str, statistic: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            metric_name: metric_name.to_string(),
            dimensions: BTreeMap::new(),
            statistic: statistic.to_string(),
        }
    }

    pub fn with_dimension(mut self, name: &str, value: Token) -> Self {
        self.dimensions.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    pub title: String,
    pub width: u32,
    pub metrics: Vec<MetricRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardProps {
    pub dashboard_name: String,
    pub period_secs: u32,
    pub widgets: Vec<Widget>,
}

// ── Graph ─────────────────────────────────────────────────────────

/// Insertion-ordered set of resources with unique logical ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource. Token references become dependencies.
    pub fn add(&mut self, id: &str, props: ResourceProps) -> ConfigResult<ResourceRef> {
        if self.index.contains_key(id) {
            return Err(ConfigError::DuplicateResource(id.to_string()));
        }

        let mut depends_on: Vec<String> = Vec::new();
        for dep in props.tokens().into_iter().flat_map(Token::references) {
            if dep != id && !depends_on.iter().any(|d| d == dep) {
                depends_on.push(dep.to_string());
            }
        }

        self.index.insert(id.to_string(), self.resources.len());
        self.resources.push(Resource {
            id: id.to_string(),
            props,
            depends_on,
        });
        Ok(ResourceRef::new(id))
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.iter().filter(move |r| r.props.kind() == kind)
    }

    pub fn count_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for resource in &self.resources {
            *counts.entry(resource.props.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(name: &str) -> ResourceProps {
        ResourceProps::Bucket(BucketProps {
            bucket_name: name.to_string(),
            access: BucketAccess::Private,
            website: None,
            removal_policy: RemovalPolicy::Destroy,
            auto_delete_objects: true,
        })
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add("Assets", bucket("a")).unwrap();
        let err = graph.add("Assets", bucket("b")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateResource(id) if id == "Assets"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn token_references_become_dependencies() {
        let mut graph = ResourceGraph::new();
        let assets = graph.add("Assets", bucket("a")).unwrap();
        graph
            .add(
                "Seed",
                ResourceProps::AssetDeployment(AssetDeploymentProps {
                    bucket: assets.token(),
                    key: "index.html".to_string(),
                    content_type: "text/html".to_string(),
                    content_sha256: String::new(),
                    size_bytes: 0,
                    invalidate: None,
                }),
            )
            .unwrap();

        assert_eq!(graph.get("Seed").unwrap().depends_on, vec!["Assets"]);
        assert_eq!(graph.count_by_kind().get("bucket"), Some(&1));
        assert_eq!(graph.of_kind("asset_deployment").count(), 1);
    }

    #[test]
    fn serializes_with_type_tag() {
        let mut graph = ResourceGraph::new();
        graph.add("Assets", bucket("shop-dev-assets")).unwrap();
        let json = serde_json::to_value(graph.get("Assets").unwrap()).unwrap();
        assert_eq!(json["type"], "bucket");
        assert_eq!(json["properties"]["bucket_name"], "shop-dev-assets");
        assert_eq!(json["properties"]["access"]["mode"], "private");
    }
}
