// ABOUTME: Config scaffolding for new factory installations.
// ABOUTME: Creates a fornax.yml template file.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(
    dir: &Path,
    region: Option<&str>,
    zone: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(
        region.unwrap_or("eu-west-2"),
        zone.unwrap_or("eu-west-2a"),
    );
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(region: &str, zone: &str) -> String {
    format!(
        r#"cloud:
  region: {region}
  zone: {zone}
  # memory backend simulates the cloud in-process; switch to external
  # once a real provider integration is wired in
  backend: memory

workers:
  max_instances: 4
  # base_image_pattern: "worker-base_*"

build:
  volume_gib: 10
  image_arch: x86_64
  max_appliance_versions: 4
  action_timeout: 1h

catalog:
  path: tklapp.json
  # url: https://marketplace.example.com

triggers:
  tree_stable_timer: 2m
  # nightly_crontab: "0 3 * * *"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactoryConfig;

    #[test]
    fn template_yaml_parses() {
        let yaml = generate_template_yaml("eu-west-2", "eu-west-2a");
        let config = FactoryConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.cloud.region, "eu-west-2");
        assert_eq!(config.build.volume_gib, 10);
    }
}
