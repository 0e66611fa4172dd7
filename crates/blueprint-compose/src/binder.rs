//! Route/compute binder.
//!
//! Creates one compute unit per route, all sharing a single identity grant
//! and a single environment map derived from the data tier, and registers
//! each route on the shared entry point.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use convert_case::{Case, Casing};
use tracing::{debug, info};

use blueprint_core::config::{ComputeBudget, HttpMethod, RouteSpec};
use blueprint_core::resource::{
    ApiMethodProps, ApiPathProps, ApiProps, FunctionProps, MetricRef, PolicyStatement,
    ResourceProps, RoleProps,
};
use blueprint_core::{ConfigError, ConfigResult, ResourceRef, Token};

use crate::data_tier::Capability;
use crate::stack::Scope;

pub const TABLE_READ_WRITE_ACTIONS: [&str; 12] = [
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

pub const STATEMENT_ACTIONS: [&str; 4] = [
    "rds-data:ExecuteStatement",
    "rds-data:BatchExecuteStatement",
    "rds-data:BeginTransaction",
    "rds-data:CommitTransaction",
];

pub const SECRET_READ_ACTIONS: [&str; 2] = [
    "secretsmanager:GetSecretValue",
    "secretsmanager:DescribeSecret",
];

pub const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";
pub const COMPUTE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const DATA_TIER_ENV: &str = "DATA_TIER";

/// Environment variables shared by every compute unit.
pub type EnvMap = BTreeMap<String, Token>;

/// The single identity every compute unit assumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub role: ResourceRef,
    pub role_name: String,
    pub statements: Vec<PolicyStatement>,
}

impl Grant {
    /// Every resource the grant covers, across all statements.
    pub fn covered_resources(&self) -> Vec<&Token> {
        self.statements.iter().flat_map(|s| s.resources.iter()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeMetrics {
    pub duration: MetricRef,
    pub invocations: MetricRef,
    pub errors: MetricRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeUnit {
    pub name: String,
    pub route: RouteSpec,
    pub function: ResourceRef,
    pub function_name: String,
    pub grant: Arc<Grant>,
    pub environment: Arc<EnvMap>,
    pub metrics: ComputeMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointMetrics {
    pub requests: MetricRef,
    pub latency: MetricRef,
    pub client_errors: MetricRef,
    pub server_errors: MetricRef,
}

/// A (method, path) pair registered on the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRoute {
    pub method: HttpMethod,
    pub path: String,
    pub unit: String,
}

/// The shared routing façade. Exists even with no routes.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    pub api: ResourceRef,
    pub api_name: String,
    pub stage: String,
    pub routes: Vec<RegisteredRoute>,
    pub metrics: EntryPointMetrics,
}

impl EntryPoint {
    pub fn url(&self) -> Token {
        self.api.attr("Url")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub units: Vec<ComputeUnit>,
    pub entry_point: EntryPoint,
    pub grant: Arc<Grant>,
    pub environment: Arc<EnvMap>,
}

/// Bind every route to its own compute unit behind one entry point.
pub fn bind(
    routes: &[RouteSpec],
    capability: &Capability,
    budget: &ComputeBudget,
    scope: &mut Scope,
) -> ConfigResult<Binding> {
    let grant = Arc::new(derive_grant(capability, scope)?);
    let environment = Arc::new(derive_environment(capability)?);
    let mut entry_point = declare_entry_point(routes, scope)?;

    let mut registered: HashSet<(HttpMethod, String)> = HashSet::new();
    let mut paths: HashMap<String, ResourceRef> = HashMap::new();
    let mut units = Vec::with_capacity(routes.len());

    for route in routes {
        let path = route.normalized_path();
        if !registered.insert((route.method, path.clone())) {
            return Err(ConfigError::DuplicateRoute {
                method: route.method.to_string(),
                path,
            });
        }

        let unit = declare_unit(route, &grant, &environment, budget, scope)?;
        let resource = ensure_path(route, &entry_point.api, &mut paths, scope)?;

        scope.graph.add(
            &format!("{}Method", route.name.to_case(Case::Pascal)),
            ResourceProps::ApiMethod(ApiMethodProps {
                api: entry_point.api.token(),
                resource,
                http_method: route.method,
                path: path.clone(),
                integration: unit.function.token(),
            }),
        )?;

        debug!(
            unit = %unit.name,
            method = %route.method,
            path = %path,
            "registered route"
        );

        entry_point.routes.push(RegisteredRoute {
            method: route.method,
            path,
            unit: unit.name.clone(),
        });
        units.push(unit);
    }

    info!(
        units = units.len(),
        role = %grant.role_name,
        env_vars = environment.len(),
        "bound compute units"
    );

    Ok(Binding {
        units,
        entry_point,
        grant,
        environment,
    })
}

fn derive_grant(capability: &Capability, scope: &mut Scope) -> ConfigResult<Grant> {
    let statements = match capability {
        Capability::Keyed { tables } => {
            let mut resources = Vec::new();
            for table in tables {
                resources.push(table.arn());
                if !table.index_names.is_empty() {
                    resources.push(Token::join([table.arn(), Token::literal("/index/*")]));
                }
            }
            vec![PolicyStatement {
                actions: to_strings(&TABLE_READ_WRITE_ACTIONS),
                resources,
            }]
        }
        Capability::Relational { cluster, secret } => vec![
            PolicyStatement {
                actions: to_strings(&STATEMENT_ACTIONS),
                resources: vec![cluster.arn()],
            },
            PolicyStatement {
                actions: to_strings(&SECRET_READ_ACTIONS),
                resources: vec![secret.arn()],
            },
        ],
    };

    let role_name = scope.namer.physical("compute-role");
    let role = scope.graph.add(
        "ComputeRole",
        ResourceProps::Role(RoleProps {
            role_name: role_name.clone(),
            assumed_by: COMPUTE_PRINCIPAL.to_string(),
            managed_policies: vec![BASIC_EXECUTION_POLICY.to_string()],
            statements: statements.clone(),
        }),
    )?;

    Ok(Grant {
        role,
        role_name,
        statements,
    })
}

fn derive_environment(capability: &Capability) -> ConfigResult<EnvMap> {
    let mut env = EnvMap::new();
    env.insert(
        DATA_TIER_ENV.to_string(),
        Token::literal(capability.tier().as_str()),
    );
    match capability {
        Capability::Keyed { tables } => {
            let mut owners: HashMap<String, &str> = HashMap::new();
            for table in tables {
                let key = table.env_key();
                if let Some(other) = owners.insert(key.clone(), &table.name) {
                    return Err(ConfigError::DuplicateTable {
                        table: table.name.clone(),
                        other: other.to_string(),
                        derived: key,
                    });
                }
                env.insert(key, table.resource.token());
            }
        }
        Capability::Relational { cluster, secret } => {
            env.insert("CLUSTER_ARN".to_string(), cluster.arn());
            env.insert("SECRET_ARN".to_string(), secret.arn());
        }
    }
    Ok(env)
}

fn declare_entry_point(routes: &[RouteSpec], scope: &mut Scope) -> ConfigResult<EntryPoint> {
    let api_name = scope.namer.physical("api");
    let stage = scope.environment.short().to_string();

    let methods: BTreeSet<HttpMethod> = routes.iter().map(|r| r.method).collect();
    let mut allow_methods: Vec<String> = methods.iter().map(|m| m.to_string()).collect();
    allow_methods.push("OPTIONS".to_string());

    let api = scope.graph.add(
        "Api",
        ResourceProps::Api(ApiProps {
            api_name: api_name.clone(),
            stage_name: stage.clone(),
            cors_allow_origins: vec!["*".to_string()],
            cors_allow_methods: allow_methods,
        }),
    )?;

    let metric = |name: &str, statistic: &str| {
        MetricRef::new("AWS/ApiGateway", name, statistic)
            .with_dimension("ApiName", Token::literal(api_name.clone()))
    };
    let metrics = EntryPointMetrics {
        requests: metric("Count", "Sum"),
        latency: metric("Latency", "Average"),
        client_errors: metric("4XXError", "Sum"),
        server_errors: metric("5XXError", "Sum"),
    };

    Ok(EntryPoint {
        api,
        api_name,
        stage,
        routes: Vec::new(),
        metrics,
    })
}

fn declare_unit(
    route: &RouteSpec,
    grant: &Arc<Grant>,
    environment: &Arc<EnvMap>,
    budget: &ComputeBudget,
    scope: &mut Scope,
) -> ConfigResult<ComputeUnit> {
    let function_name = scope.namer.physical(&route.name);
    let function = scope.graph.add(
        &format!("{}Function", route.name.to_case(Case::Pascal)),
        ResourceProps::Function(FunctionProps {
            function_name: function_name.clone(),
            runtime: budget.runtime.clone(),
            handler: format!("{}.handler", route.name),
            code_path: budget.code_path.clone(),
            memory_mb: budget.memory_mb,
            timeout_secs: budget.timeout_secs,
            role: grant.role.attr("Arn"),
            environment: environment.as_ref().clone(),
            log_retention_days: scope.environment.log_retention_days(),
        }),
    )?;

    let metric = |name: &str, statistic: &str| {
        MetricRef::new("AWS/Lambda", name, statistic).with_dimension("FunctionName", function.token())
    };
    let metrics = ComputeMetrics {
        duration: metric("Duration", "Average"),
        invocations: metric("Invocations", "Sum"),
        errors: metric("Errors", "Sum"),
    };

    Ok(ComputeUnit {
        name: route.name.clone(),
        route: route.clone(),
        function_name,
        function,
        grant: Arc::clone(grant),
        environment: Arc::clone(environment),
        metrics,
    })
}

/// Resolve the path resource for a route, declaring missing segments.
/// Segments are shared between routes with a common prefix.
fn ensure_path(
    route: &RouteSpec,
    api: &ResourceRef,
    paths: &mut HashMap<String, ResourceRef>,
    scope: &mut Scope,
) -> ConfigResult<Token> {
    let mut parent = api.attr("RootResourceId");
    let mut prefix = String::new();
    let mut id = String::from("Api");

    for segment in route.segments() {
        prefix.push('/');
        prefix.push_str(segment);
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(param) => {
                id.push_str("By");
                id.push_str(&param.to_case(Case::Pascal));
            }
            None => id.push_str(&segment.to_case(Case::Pascal)),
        }

        let resource = match paths.get(&prefix) {
            Some(existing) => existing.clone(),
            None => {
                // `/user-profile` and `/user/profile` derive the same id.
                let mut logical_id = format!("{id}Path");
                let mut n = 2;
                while scope.graph.get(&logical_id).is_some() {
                    logical_id = format!("{id}{n}Path");
                    n += 1;
                }
                let created = scope.graph.add(
                    &logical_id,
                    ResourceProps::ApiPath(ApiPathProps {
                        api: api.token(),
                        parent: parent.clone(),
                        path_part: segment.to_string(),
                    }),
                )?;
                paths.insert(prefix.clone(), created.clone());
                created
            }
        };
        parent = resource.token();
    }

    Ok(parent)
}

fn to_strings(actions: &[&str]) -> Vec<String> {
    actions.iter().map(|a| a.to_string()).collect()
}
