use std::path::Path;

use anyhow::bail;
use blueprint_core::config::TierKind;
use blueprint_core::{Environment, StackConfig};

use crate::Tier;

pub fn init(path: &str, project: &str, environment: &str, tier: Tier) -> anyhow::Result<()> {
    let output = Path::new(path).join("blueprint.toml");
    if output.exists() {
        bail!("{} already exists", output.display());
    }

    let environment: Environment = environment.parse()?;
    let kind = match tier {
        Tier::Keyed => TierKind::Keyed,
        Tier::Relational => TierKind::Relational,
    };

    let config = StackConfig::scaffold(project, environment, kind);
    config.validate()?;

    std::fs::write(&output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffolds_a_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        init(path, "shop", "staging", Tier::Relational).unwrap();

        let config = StackConfig::from_file(&dir.path().join("blueprint.toml")).unwrap();
        assert_eq!(config.project.name, "shop");
        assert_eq!(config.data.kind, TierKind::Relational);
        assert!(blueprint_compose::compose(&config).is_ok());
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        init(path, "shop", "development", Tier::Keyed).unwrap();
        assert!(init(path, "shop", "development", Tier::Keyed).is_err());
    }

    #[test]
    fn rejects_invalid_project_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        assert!(init(path, "Shop App", "development", Tier::Keyed).is_err());
        assert!(!dir.path().join("blueprint.toml").exists());
    }
}
