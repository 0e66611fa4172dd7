//! Data tier selector.
//!
//! Declares exactly one of the two backend topologies and returns a
//! [`Capability`] handle that downstream components match on.

use convert_case::{Case, Casing};
use tracing::{debug, info};

use blueprint_core::config::{ClusterSpec, DataConfig, DataTierSpec, Dialect, TableSpec, TierKind};
use blueprint_core::resource::{
    ClusterProps, NetworkProps, ResourceProps, SecondaryIndex, SecretProps, TableProps,
};
use blueprint_core::{ConfigError, ConfigResult, ResourceRef, Token};

use crate::stack::Scope;

/// Characters the platform must not use when generating the admin password.
pub const PASSWORD_EXCLUDED_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";
pub const PASSWORD_LENGTH: u32 = 30;
pub const NETWORK_MAX_AZS: u32 = 2;

/// A declared keyed table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    /// Name as written in the configuration, e.g. `Users`.
    pub name: String,
    pub table_name: String,
    pub resource: ResourceRef,
    pub index_names: Vec<String>,
}

impl TableHandle {
    pub fn arn(&self) -> Token {
        self.resource.attr("Arn")
    }

    /// Environment variable carrying the physical table name.
    pub fn env_key(&self) -> String {
        format!("{}_TABLE", self.name.to_case(Case::UpperSnake))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterHandle {
    pub resource: ResourceRef,
    pub network: ResourceRef,
    pub database_name: String,
    pub dialect: Dialect,
}

impl ClusterHandle {
    pub fn arn(&self) -> Token {
        self.resource.attr("Arn")
    }

    pub fn endpoint(&self) -> Token {
        self.resource.attr("Endpoint.Address")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecretHandle {
    pub resource: ResourceRef,
}

impl SecretHandle {
    pub fn arn(&self) -> Token {
        self.resource.token()
    }
}

/// Handle to whichever data tier was selected. Never both, never neither.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Keyed {
        tables: Vec<TableHandle>,
    },
    Relational {
        cluster: ClusterHandle,
        secret: SecretHandle,
    },
}

impl Capability {
    pub fn tier(&self) -> TierKind {
        match self {
            Capability::Keyed { .. } => TierKind::Keyed,
            Capability::Relational { .. } => TierKind::Relational,
        }
    }

    pub fn tables(&self) -> ConfigResult<&[TableHandle]> {
        match self {
            Capability::Keyed { tables } => Ok(tables),
            Capability::Relational { .. } => Err(ConfigError::WrongTier {
                requested: TierKind::Keyed.as_str(),
                active: TierKind::Relational.as_str(),
            }),
        }
    }

    pub fn cluster(&self) -> ConfigResult<(&ClusterHandle, &SecretHandle)> {
        match self {
            Capability::Relational { cluster, secret } => Ok((cluster, secret)),
            Capability::Keyed { .. } => Err(ConfigError::WrongTier {
                requested: TierKind::Relational.as_str(),
                active: TierKind::Keyed.as_str(),
            }),
        }
    }
}

/// Declare the configured data tier.
pub fn select(data: &DataConfig, scope: &mut Scope) -> ConfigResult<Capability> {
    let capability = match data.resolve()? {
        DataTierSpec::Keyed(tables) => Capability::Keyed {
            tables: tables
                .iter()
                .map(|table| declare_table(table, scope))
                .collect::<ConfigResult<_>>()?,
        },
        DataTierSpec::Relational(cluster) => declare_cluster(cluster, scope)?,
    };

    info!(tier = capability.tier().as_str(), "selected data tier");
    Ok(capability)
}

fn declare_table(spec: &TableSpec, scope: &mut Scope) -> ConfigResult<TableHandle> {
    let env = scope.environment;
    let table_name = scope.namer.physical(&spec.name);

    // Indexes are passed through as given; duplicates surface at deploy time.
    let secondary_indexes: Vec<SecondaryIndex> = spec
        .indexes
        .iter()
        .map(|index| SecondaryIndex {
            index_name: index.name.clone(),
            partition_key: index.partition_key.clone(),
            sort_key: index.sort_key.clone(),
        })
        .collect();

    let resource = scope.graph.add(
        &spec.logical_id(),
        ResourceProps::Table(TableProps {
            table_name: table_name.clone(),
            partition_key: spec.partition_key.clone(),
            sort_key: spec.sort_key.clone(),
            point_in_time_recovery: env.point_in_time_recovery(),
            removal_policy: env.removal_policy(),
            secondary_indexes,
        }),
    )?;

    debug!(
        table = %table_name,
        partition_key = %spec.partition_key,
        indexes = spec.indexes.len(),
        "declared table"
    );

    Ok(TableHandle {
        name: spec.name.clone(),
        table_name,
        resource,
        index_names: spec.indexes.iter().map(|i| i.name.clone()).collect(),
    })
}

fn declare_cluster(spec: &ClusterSpec, scope: &mut Scope) -> ConfigResult<Capability> {
    let env = scope.environment;

    let network = scope.graph.add(
        "DatabaseNetwork",
        ResourceProps::Network(NetworkProps {
            name: scope.namer.physical("network"),
            max_azs: NETWORK_MAX_AZS,
            nat_gateways: 0,
            isolated_subnets: true,
        }),
    )?;

    let secret = scope.graph.add(
        "DatabaseSecret",
        ResourceProps::Secret(SecretProps {
            secret_name: scope.namer.physical("db-credentials"),
            username: spec.admin_username.clone(),
            password_length: PASSWORD_LENGTH,
            exclude_characters: PASSWORD_EXCLUDED_CHARACTERS.to_string(),
        }),
    )?;

    let capacity = env.cluster_capacity();
    let cluster = scope.graph.add(
        "DatabaseCluster",
        ResourceProps::Cluster(ClusterProps {
            cluster_identifier: scope.namer.physical("cluster"),
            engine: spec.dialect.engine().to_string(),
            port: spec.dialect.default_port(),
            default_database_name: spec.database_name.clone(),
            credentials: secret.token(),
            network: network.token(),
            min_capacity: capacity.min_capacity,
            max_capacity: capacity.max_capacity,
            auto_pause_minutes: capacity.auto_pause_minutes,
            http_endpoint: spec.http_endpoint,
            removal_policy: env.removal_policy(),
        }),
    )?;

    debug!(
        engine = spec.dialect.engine(),
        min = capacity.min_capacity,
        max = capacity.max_capacity,
        auto_pause = ?capacity.auto_pause_minutes,
        "declared relational cluster"
    );

    Ok(Capability::Relational {
        cluster: ClusterHandle {
            resource: cluster,
            network,
            database_name: spec.database_name.clone(),
            dialect: spec.dialect,
        },
        secret: SecretHandle { resource: secret },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::config::{IndexSpec, StackConfig};
    use blueprint_core::environment::{Environment, RemovalPolicy};

    fn scope_for(env: Environment) -> (StackConfig, Scope) {
        let config = StackConfig::scaffold("shop", env, TierKind::Keyed);
        let scope = Scope::new(&config);
        (config, scope)
    }

    #[test]
    fn keyed_tier_declares_one_table_per_spec() {
        let (config, mut scope) = scope_for(Environment::Development);
        let capability = select(&config.data, &mut scope).unwrap();

        let tables = capability.tables().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_name, "shop-dev-users");
        assert_eq!(tables[0].env_key(), "USERS_TABLE");
        assert_eq!(tables[0].index_names, vec!["email-index"]);
        assert!(capability.cluster().is_err());
        assert_eq!(scope.graph.of_kind("table").count(), 2);
        assert_eq!(scope.graph.of_kind("cluster").count(), 0);
    }

    #[test]
    fn retention_follows_environment() {
        for (env, policy) in [
            (Environment::Production, RemovalPolicy::Retain),
            (Environment::Staging, RemovalPolicy::Destroy),
        ] {
            let (config, mut scope) = scope_for(env);
            select(&config.data, &mut scope).unwrap();
            for resource in scope.graph.of_kind("table") {
                let ResourceProps::Table(props) = &resource.props else {
                    panic!("expected table");
                };
                assert_eq!(props.removal_policy, policy);
                assert_eq!(props.point_in_time_recovery, env.is_production());
            }
        }
    }

    #[test]
    fn duplicate_index_names_pass_through() {
        let (mut config, mut scope) = scope_for(Environment::Development);
        let tables = config.data.tables.as_mut().unwrap();
        let dup = IndexSpec {
            name: "email-index".to_string(),
            partition_key: "altEmail".to_string(),
            sort_key: None,
        };
        tables[0].indexes.push(dup);

        let capability = select(&config.data, &mut scope).unwrap();
        assert_eq!(capability.tables().unwrap()[0].index_names.len(), 2);
    }

    #[test]
    fn relational_tier_declares_network_secret_cluster() {
        let config = StackConfig::scaffold("shop", Environment::Development, TierKind::Relational);
        let mut scope = Scope::new(&config);
        let capability = select(&config.data, &mut scope).unwrap();

        let (cluster, secret) = capability.cluster().unwrap();
        assert_eq!(cluster.dialect, Dialect::Postgresql);
        assert_eq!(secret.arn().to_string(), "${DatabaseSecret}");
        assert!(capability.tables().is_err());

        let Some(resource) = scope.graph.get("DatabaseCluster") else {
            panic!("cluster not declared");
        };
        let ResourceProps::Cluster(props) = &resource.props else {
            panic!("expected cluster");
        };
        assert_eq!(props.auto_pause_minutes, Some(10));
        assert_eq!(props.port, 5432);
        assert_eq!(resource.depends_on, vec!["DatabaseSecret", "DatabaseNetwork"]);
        assert_eq!(scope.graph.of_kind("table").count(), 0);
    }

    #[test]
    fn production_cluster_stays_warm() {
        let config = StackConfig::scaffold("shop", Environment::Production, TierKind::Relational);
        let mut scope = Scope::new(&config);
        select(&config.data, &mut scope).unwrap();
        let ResourceProps::Cluster(props) = &scope.graph.get("DatabaseCluster").unwrap().props else {
            panic!("expected cluster");
        };
        assert_eq!(props.auto_pause_minutes, None);
        assert_eq!(props.min_capacity, 2);
    }

    #[test]
    fn missing_sub_spec_is_a_configuration_error() {
        let mut config = StackConfig::scaffold("shop", Environment::Development, TierKind::Relational);
        config.data.cluster = None;
        let mut scope = Scope::new(&config);
        let err = select(&config.data, &mut scope).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTierSpec { .. }));
        assert!(scope.graph.is_empty());
    }
}
