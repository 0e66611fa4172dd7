//! blueprint-core — configuration snapshot and resource graph types.
//!
//! The composition engine in `blueprint-compose` reads a [`StackConfig`],
//! declares resources into a [`ResourceGraph`], and renders a
//! [`Template`] for the orchestration platform.

pub mod config;
pub mod environment;
pub mod error;
pub mod naming;
pub mod output;
pub mod resource;
pub mod token;

pub use config::StackConfig;
pub use environment::Environment;
pub use error::{ConfigError, ConfigResult};
pub use output::{OutputEntry, Template};
pub use resource::ResourceGraph;
pub use token::{ResourceRef, Token};
