//! Stack outputs and the synthesized template.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::StackConfig;
use crate::naming::Namer;
use crate::resource::{Resource, ResourceGraph};
use crate::token::Token;

/// One externally visible output. Absent resources never produce one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEntry {
    pub name: String,
    pub label: String,
    pub value: Token,
}

impl OutputEntry {
    pub fn new(name: impl Into<String>, label: impl Into<String>, value: Token) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateOutput {
    pub description: String,
    pub value: Token,
    pub export_name: String,
}

/// The artefact handed to the orchestration platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub description: String,
    /// Applied to every resource by the platform.
    pub tags: BTreeMap<String, String>,
    pub resources: BTreeMap<String, Resource>,
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    pub fn new(config: &StackConfig, graph: &ResourceGraph, outputs: &[OutputEntry]) -> Self {
        let namer = Namer::new(config);
        let description = config.project.description.clone().unwrap_or_else(|| {
            format!(
                "{} backend ({})",
                config.project.name,
                config.environment()
            )
        });

        let mut tags = BTreeMap::new();
        tags.insert("project".to_string(), config.project.name.clone());
        tags.insert("environment".to_string(), config.environment().to_string());

        Template {
            description,
            tags,
            resources: graph
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            outputs: outputs
                .iter()
                .map(|o| {
                    (
                        o.name.clone(),
                        TemplateOutput {
                            description: o.label.clone(),
                            value: o.value.clone(),
                            export_name: namer.export(&o.name),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
