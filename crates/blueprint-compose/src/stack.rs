//! Composition root.
//!
//! Runs the components in dependency order (data tier, routes, assets,
//! observability), then derives the output list. Either the whole graph
//! is produced or the first configuration error is returned.

use tracing::info;

use blueprint_core::environment::Environment;
use blueprint_core::naming::Namer;
use blueprint_core::{ConfigResult, OutputEntry, ResourceGraph, StackConfig, Template};

use crate::assets::{self, Assets};
use crate::binder::{self, Binding};
use crate::data_tier::{self, Capability};
use crate::observability::{self, DashboardHandle};
use crate::outputs::{self, OutputSources};

/// Mutable state threaded through one composition run.
#[derive(Debug)]
pub struct Scope {
    pub graph: ResourceGraph,
    pub namer: Namer,
    pub environment: Environment,
}

impl Scope {
    pub fn new(config: &StackConfig) -> Self {
        Self {
            graph: ResourceGraph::new(),
            namer: Namer::new(config),
            environment: config.environment(),
        }
    }
}

/// The fully composed object graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub config: StackConfig,
    pub graph: ResourceGraph,
    pub capability: Capability,
    pub binding: Binding,
    pub assets: Assets,
    pub dashboard: Option<DashboardHandle>,
    pub outputs: Vec<OutputEntry>,
}

impl Stack {
    pub fn template(&self) -> Template {
        Template::new(&self.config, &self.graph, &self.outputs)
    }
}

/// Compose a stack from a configuration snapshot.
pub fn compose(config: &StackConfig) -> ConfigResult<Stack> {
    config.validate()?;

    let mut scope = Scope::new(config);
    info!(
        project = %config.project.name,
        environment = %config.environment(),
        "composing stack"
    );

    let capability = data_tier::select(&config.data, &mut scope)?;
    let binding = binder::bind(&config.routes, &capability, &config.compute, &mut scope)?;
    let assets = assets::provision(&config.assets, &mut scope)?;
    let dashboard = observability::aggregate(
        config.observability.as_ref(),
        &binding.units,
        &binding.entry_point,
        assets.distribution.as_ref(),
        &mut scope,
    )?;

    let outputs = outputs::collect(
        &OutputSources {
            capability: &capability,
            binding: &binding,
            assets: &assets,
        },
        &scope.graph,
    )?;

    info!(
        resources = scope.graph.len(),
        outputs = outputs.len(),
        "composed stack"
    );

    Ok(Stack {
        config: config.clone(),
        graph: scope.graph,
        capability,
        binding,
        assets,
        dashboard,
        outputs,
    })
}
