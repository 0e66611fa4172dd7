//! Output manifest and deduplication.
//!
//! Walks a fixed list of candidate outputs. A candidate is emitted only if
//! its source handle exists and every resource its value references was
//! declared; disabled features therefore produce no entry at all.

use std::collections::HashMap;

use convert_case::{Case, Casing};
use tracing::{debug, warn};

use blueprint_core::{ConfigError, ConfigResult, OutputEntry, ResourceGraph};

use crate::assets::Assets;
use crate::binder::Binding;
use crate::data_tier::Capability;

/// Candidate outputs, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    EntryPointUrl,
    SiteUrl,
    DistributionUrl,
    StorageName,
    /// Expands to one entry per keyed table.
    TableNames,
    ClusterEndpoint,
}

pub const MANIFEST: [Candidate; 6] = [
    Candidate::EntryPointUrl,
    Candidate::SiteUrl,
    Candidate::DistributionUrl,
    Candidate::StorageName,
    Candidate::TableNames,
    Candidate::ClusterEndpoint,
];

/// Handles the manifest reads from.
#[derive(Debug, Clone, Copy)]
pub struct OutputSources<'a> {
    pub capability: &'a Capability,
    pub binding: &'a Binding,
    pub assets: &'a Assets,
}

impl Candidate {
    fn resolve(self, sources: &OutputSources<'_>) -> Vec<OutputEntry> {
        match self {
            Candidate::EntryPointUrl => vec![OutputEntry::new(
                "ApiUrl",
                "Entry point base URL",
                sources.binding.entry_point.url(),
            )],
            Candidate::SiteUrl => sources
                .assets
                .site_url()
                .map(|url| OutputEntry::new("SiteUrl", "Static site URL", url))
                .into_iter()
                .collect(),
            Candidate::DistributionUrl => sources
                .assets
                .distribution
                .as_ref()
                .map(|d| OutputEntry::new("DistributionUrl", "Distribution URL", d.url()))
                .into_iter()
                .collect(),
            Candidate::StorageName => vec![OutputEntry::new(
                "AssetsBucketName",
                "Asset storage bucket",
                sources.assets.storage.token(),
            )],
            Candidate::TableNames => match sources.capability {
                Capability::Keyed { tables } => tables
                    .iter()
                    .map(|table| {
                        OutputEntry::new(
                            format!("{}TableName", table.name.to_case(Case::Pascal)),
                            format!("{} table name", table.name),
                            table.resource.token(),
                        )
                    })
                    .collect(),
                Capability::Relational { .. } => vec![],
            },
            Candidate::ClusterEndpoint => match sources.capability {
                Capability::Relational { cluster, .. } => vec![OutputEntry::new(
                    "ClusterEndpoint",
                    "Relational cluster endpoint",
                    cluster.endpoint(),
                )],
                Capability::Keyed { .. } => vec![],
            },
        }
    }
}

/// Walk the manifest and return the canonical output list.
///
/// Entries repeated with an identical value collapse into one; the same
/// name with a different value is a configuration error.
pub fn collect(sources: &OutputSources<'_>, graph: &ResourceGraph) -> ConfigResult<Vec<OutputEntry>> {
    let mut outputs: Vec<OutputEntry> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for candidate in MANIFEST {
        for entry in candidate.resolve(sources) {
            if let Some(missing) = entry
                .value
                .references()
                .into_iter()
                .find(|id| graph.get(id).is_none())
            {
                warn!(output = %entry.name, resource = missing, "skipping output for undeclared resource");
                continue;
            }

            match seen.get(&entry.name) {
                Some(&i) if outputs[i] == entry => {
                    debug!(output = %entry.name, "dropped duplicate output");
                }
                Some(_) => return Err(ConfigError::OutputConflict(entry.name)),
                None => {
                    seen.insert(entry.name.clone(), outputs.len());
                    outputs.push(entry);
                }
            }
        }
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::config::{StackConfig, TierKind};
    use blueprint_core::environment::Environment;

    use crate::stack::compose;

    fn names(config: &StackConfig) -> Vec<String> {
        compose(config)
            .unwrap()
            .outputs
            .into_iter()
            .map(|o| o.name)
            .collect()
    }

    #[test]
    fn keyed_outputs_expand_per_table() {
        let mut config = StackConfig::scaffold("shop", Environment::Development, TierKind::Keyed);
        config.assets.hosting = false;
        config.assets.distribution = false;
        assert_eq!(
            names(&config),
            vec!["ApiUrl", "AssetsBucketName", "UsersTableName", "ItemsTableName"]
        );
    }

    #[test]
    fn relational_outputs_cluster_endpoint() {
        let config = StackConfig::scaffold("shop", Environment::Development, TierKind::Relational);
        assert_eq!(
            names(&config),
            vec!["ApiUrl", "SiteUrl", "DistributionUrl", "AssetsBucketName", "ClusterEndpoint"]
        );
    }

    #[test]
    fn undeclared_resources_are_skipped() {
        let config = StackConfig::scaffold("shop", Environment::Development, TierKind::Keyed);
        let stack = compose(&config).unwrap();
        let sources = OutputSources {
            capability: &stack.capability,
            binding: &stack.binding,
            assets: &stack.assets,
        };
        let outputs = collect(&sources, &ResourceGraph::new()).unwrap();
        assert!(outputs.is_empty());
    }
}
