use std::path::Path;

use anyhow::Context;
use blueprint_compose::{Stack, compose, report};
use blueprint_core::StackConfig;

use crate::{Format, Overrides};

/// Load the snapshot and apply command-line overrides.
pub fn load(config: &str, overrides: &Overrides) -> anyhow::Result<StackConfig> {
    let path = Path::new(config);
    let mut snapshot = StackConfig::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    if let Some(environment) = &overrides.environment {
        snapshot.project.environment = environment.parse()?;
    }
    if let Some(project) = &overrides.project {
        snapshot.project.name = project.clone();
    }
    tracing::debug!(
        path = %path.display(),
        project = %snapshot.project.name,
        environment = %snapshot.environment(),
        "loaded configuration"
    );
    Ok(snapshot)
}

fn composed(config: &str, overrides: &Overrides) -> anyhow::Result<Stack> {
    let snapshot = load(config, overrides)?;
    Ok(compose(&snapshot)?)
}

pub fn synth(
    config: &str,
    overrides: &Overrides,
    format: Format,
    out: Option<&str>,
) -> anyhow::Result<()> {
    let stack = composed(config, overrides)?;

    let rendered = match format {
        Format::Json => stack.template().to_json()?,
        Format::Text => report::format_report(&stack),
    };

    match out {
        Some(out) => {
            std::fs::write(out, rendered).with_context(|| format!("writing {out}"))?;
            println!(
                "✓ Synthesized {} resources to {out}",
                stack.graph.len()
            );
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

pub fn validate(config: &str, overrides: &Overrides) -> anyhow::Result<()> {
    let stack = composed(config, overrides)?;
    println!(
        "✓ {} ({}) is valid: {} resources, {} outputs",
        stack.config.project.name,
        stack.config.environment(),
        stack.graph.len(),
        stack.outputs.len()
    );
    Ok(())
}

pub fn outputs(config: &str, overrides: &Overrides) -> anyhow::Result<()> {
    let stack = composed(config, overrides)?;
    for output in &stack.outputs {
        println!("{:<20} {:<32} {}", output.name, output.label, output.value);
    }
    Ok(())
}
