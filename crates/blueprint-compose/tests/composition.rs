//! End-to-end composition tests.
//!
//! Loads the blueprints under `tests/blueprints/` and checks the
//! cross-component contracts of a composed stack.

use std::path::PathBuf;
use std::sync::Arc;

use blueprint_compose::assets::AccessMode;
use blueprint_compose::{Capability, Stack, compose};
use blueprint_core::config::{HttpMethod, RouteSpec, TierKind};
use blueprint_core::resource::{BucketAccess, ResourceProps};
use blueprint_core::{ConfigError, Environment, StackConfig};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn load(name: &str) -> StackConfig {
    let path = workspace_root().join("tests/blueprints").join(name);
    StackConfig::from_file(&path).unwrap()
}

fn output_names(stack: &Stack) -> Vec<&str> {
    stack.outputs.iter().map(|o| o.name.as_str()).collect()
}

#[test]
fn keyed_scenario_two_tables_eight_routes() {
    let stack = compose(&load("keyed-two-tables.toml")).unwrap();

    assert_eq!(stack.binding.units.len(), 8);
    assert_eq!(stack.graph.of_kind("role").count(), 1);

    let Capability::Keyed { tables } = &stack.capability else {
        panic!("expected keyed tier");
    };
    assert_eq!(tables.len(), 2);

    let mut granted: Vec<String> = stack
        .binding
        .grant
        .covered_resources()
        .iter()
        .flat_map(|t| t.references())
        .map(str::to_string)
        .collect();
    granted.dedup();
    assert_eq!(granted, vec!["UsersTable", "ItemsTable"]);

    let names = output_names(&stack);
    assert_eq!(
        names,
        vec!["ApiUrl", "SiteUrl", "AssetsBucketName", "UsersTableName", "ItemsTableName"]
    );
    assert_eq!(names.iter().filter(|n| n.ends_with("TableName")).count(), 2);
    assert!(stack.dashboard.is_some());
}

#[test]
fn exactly_one_tier_is_populated() {
    for kind in [TierKind::Keyed, TierKind::Relational] {
        let config = StackConfig::scaffold("shop", Environment::Development, kind);
        let stack = compose(&config).unwrap();
        assert_eq!(stack.capability.tier(), kind);
        assert_ne!(
            stack.capability.tables().is_ok(),
            stack.capability.cluster().is_ok()
        );
        let has_tables = stack.graph.of_kind("table").count() > 0;
        let has_cluster = stack.graph.of_kind("cluster").count() > 0;
        assert!(has_tables ^ has_cluster);
    }
}

#[test]
fn units_share_one_grant_and_environment() {
    let stack = compose(&load("relational-cdn.toml")).unwrap();
    let units = &stack.binding.units;
    assert_eq!(units.len(), 3);

    let first = &units[0];
    for unit in units {
        assert!(Arc::ptr_eq(&unit.grant, &first.grant));
        assert!(Arc::ptr_eq(&unit.environment, &first.environment));
    }

    let mut names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), units.len());
}

#[test]
fn relational_scenario_outputs() {
    let stack = compose(&load("relational-cdn.toml")).unwrap();
    assert_eq!(
        output_names(&stack),
        vec!["ApiUrl", "SiteUrl", "DistributionUrl", "AssetsBucketName", "ClusterEndpoint"]
    );
    let site = &stack.outputs[1];
    let distribution = &stack.outputs[2];
    assert_eq!(site.value, distribution.value);
    assert_eq!(site.value.to_string(), "https://ledger.example.com");
    assert_eq!(stack.graph.of_kind("certificate").count(), 1);
    assert!(stack.dashboard.is_none());
}

#[test]
fn duplicate_route_aborts_composition() {
    let err = compose(&load("duplicate-route.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRoute { .. }));
}

#[test]
fn missing_sub_spec_aborts_composition() {
    let err = compose(&load("missing-cluster.toml")).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MissingTierSpec { tier: "relational", .. }
    ));
}

#[test]
fn same_method_on_two_paths_composes() {
    let mut config = StackConfig::scaffold("shop", Environment::Development, TierKind::Keyed);
    config.routes = vec![
        RouteSpec::new("list-items", HttpMethod::Get, "/items"),
        RouteSpec::new("list-users", HttpMethod::Get, "/users"),
    ];
    let stack = compose(&config).unwrap();
    assert_eq!(stack.binding.entry_point.routes.len(), 2);
}

#[test]
fn empty_routes_keep_the_entry_point() {
    let mut config = StackConfig::scaffold("shop", Environment::Development, TierKind::Keyed);
    config.routes.clear();
    let stack = compose(&config).unwrap();
    assert!(stack.binding.units.is_empty());
    assert!(output_names(&stack).contains(&"ApiUrl"));
}

#[test]
fn feature_flags_drive_site_outputs() {
    let cases = [
        (false, false, vec![], AccessMode::Private),
        (true, false, vec!["SiteUrl"], AccessMode::PublicRead),
        (false, true, vec!["SiteUrl", "DistributionUrl"], AccessMode::DistributionOnly),
        (true, true, vec!["SiteUrl", "DistributionUrl"], AccessMode::DistributionOnly),
    ];

    for (hosting, distribution, expected, access) in cases {
        let mut config = StackConfig::scaffold("shop", Environment::Development, TierKind::Keyed);
        config.assets.hosting = hosting;
        config.assets.distribution = distribution;
        let stack = compose(&config).unwrap();

        let site_outputs: Vec<&str> = output_names(&stack)
            .into_iter()
            .filter(|n| *n == "SiteUrl" || *n == "DistributionUrl")
            .collect();
        assert_eq!(site_outputs, expected, "hosting={hosting} distribution={distribution}");
        assert_eq!(stack.assets.access, access);

        let ResourceProps::Bucket(bucket) = &stack.graph.get("AssetsBucket").unwrap().props else {
            panic!("expected bucket");
        };
        match access {
            AccessMode::Private => assert_eq!(bucket.access, BucketAccess::Private),
            AccessMode::PublicRead => assert_eq!(bucket.access, BucketAccess::PublicRead),
            AccessMode::DistributionOnly => {
                assert!(matches!(bucket.access, BucketAccess::DistributionOnly { .. }))
            }
        }
    }
}

#[test]
fn composition_is_idempotent() {
    let config = load("keyed-two-tables.toml");
    let first = compose(&config).unwrap();
    let second = compose(&config).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.template().to_json().unwrap(),
        second.template().to_json().unwrap()
    );
}

#[test]
fn template_serializes_resources_and_exports() {
    let stack = compose(&load("keyed-two-tables.toml")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stack.template().to_json().unwrap()).unwrap();

    assert_eq!(json["tags"]["environment"], "production");
    assert_eq!(json["resources"]["UsersTable"]["type"], "table");
    assert_eq!(
        json["resources"]["UsersTable"]["properties"]["removal_policy"],
        "retain"
    );
    assert_eq!(json["outputs"]["ApiUrl"]["value"], "${Api.Url}");
    assert_eq!(json["outputs"]["ApiUrl"]["export_name"], "shop-prod-ApiUrl");
    assert_eq!(
        json["resources"]["GetItemFunction"]["properties"]["memory_mb"],
        512
    );
}
