//! blueprint-compose — the resource composition engine.
//!
//! Turns one [`StackConfig`](blueprint_core::StackConfig) into a wired
//! resource graph for a web backend.
//!
//! # Components
//!
//! - **`data_tier`** — selects the keyed-table or relational backend
//! - **`binder`** — one compute unit per route, a shared grant and environment
//! - **`assets`** — storage bucket with optional global distribution
//! - **`observability`** — optional dashboard over exposed metric references
//! - **`outputs`** — manifest walk producing the deduplicated output list
//! - **`stack`** — composition root sequencing the above

pub mod assets;
pub mod binder;
pub mod data_tier;
pub mod observability;
pub mod outputs;
pub mod report;
pub mod stack;

pub use data_tier::Capability;
pub use stack::{Scope, Stack, compose};
