//! Derived resource names.
//!
//! Physical names are `{project}-{env}-{component}`; logical ids are the
//! PascalCase of the component. Both are pure functions of the snapshot.

use convert_case::{Case, Casing};

use crate::config::StackConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namer {
    prefix: String,
}

impl Namer {
    pub fn new(config: &StackConfig) -> Self {
        Self {
            prefix: format!("{}-{}", config.project.name, config.environment().short()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical name for a component, e.g. `shop-prod-users`.
    pub fn physical(&self, component: &str) -> String {
        format!("{}-{}", self.prefix, component.to_case(Case::Kebab))
    }

    /// Export name for a stack output.
    pub fn export(&self, output: &str) -> String {
        format!("{}-{}", self.prefix, output)
    }
}
