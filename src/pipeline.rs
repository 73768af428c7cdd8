// ABOUTME: Assembles the fixed step sequence for one catalog entry.
// ABOUTME: Clone, attach, build, install, image, then always-run cleanup and pruning.

use std::collections::HashMap;

use crate::build::{StepKind, StepSpec};
use crate::catalog::CatalogEntry;
use crate::config::BuildConfig;

/// Step names, also what failure reports surface to users.
pub mod step_name {
    pub const CLONE: &str = "Cloning repository";
    pub const RESOLVE_INSTANCE: &str = "Resolving worker instance";
    pub const ATTACH_VOLUME: &str = "Creating build volume";
    pub const BUILD: &str = "Building appliance";
    pub const INSTALL: &str = "Installing appliance";
    pub const CREATE_IMAGE: &str = "Creating image";
    pub const DESTROY_VOLUME: &str = "Cleaning up volume";
    pub const PRUNE_IMAGES: &str = "Pruning old images";
    pub const CLEAN_DIRS: &str = "Cleaning up build dirs";
}

/// Build the step sequence for one appliance pipeline.
///
/// The shape is fixed; only names, paths, and the build command vary per
/// entry. Volume teardown and workspace cleanup are `always_run` so they
/// execute under every outcome, including cancellation.
pub fn build_pipeline(entry: &CatalogEntry, settings: &BuildConfig) -> Vec<StepSpec> {
    let appliance = &entry.appliance;
    let workdir = format!(
        "{}/{}",
        settings.products_dir.trim_end_matches('/'),
        appliance
    );
    let mount_point = settings
        .mount_point
        .replace("{appliance}", appliance.as_str());
    let work_dir = settings.work_dir.replace("{appliance}", appliance.as_str());

    // `{device}` stays a placeholder here; the shell step substitutes the
    // attach step's property at execution time.
    let mut build_cmd = settings.build_command.clone();
    build_cmd.extend(
        [
            "--turnkey-app",
            appliance.as_str(),
            "--device",
            "{device}",
            "--mount-point",
            &mount_point,
            "--work-dir",
            &work_dir,
        ]
        .map(String::from),
    );

    let env = build_env(settings);
    let shell = |suffix: &str| {
        let mut argv = build_cmd.clone();
        argv.push(suffix.to_string());
        StepKind::Shell {
            argv,
            env: env.clone(),
        }
    };

    vec![
        StepSpec::new(
            step_name::CLONE,
            StepKind::GitClone {
                repourl: entry.repository.clone(),
                branch: entry.branch.clone(),
                workdir,
            },
        )
        .halt_on_failure(),
        StepSpec::new(step_name::RESOLVE_INSTANCE, StepKind::ResolveInstance).halt_on_failure(),
        StepSpec::new(step_name::ATTACH_VOLUME, StepKind::AttachVolume).halt_on_failure(),
        StepSpec::new(step_name::BUILD, shell("--build-only")).halt_on_failure(),
        StepSpec::new(step_name::INSTALL, shell("--install-only")).halt_on_failure(),
        StepSpec::new(
            step_name::CREATE_IMAGE,
            StepKind::CreateImage {
                appliance: appliance.clone(),
                repourl: entry.repository.clone(),
            },
        )
        .halt_on_failure(),
        StepSpec::new(step_name::DESTROY_VOLUME, StepKind::DestroyVolume).always_run(),
        StepSpec::new(
            step_name::PRUNE_IMAGES,
            StepKind::PruneImages {
                appliance: appliance.clone(),
                max_versions: settings.max_appliance_versions,
            },
        ),
        StepSpec::new(step_name::CLEAN_DIRS, shell("--clean-only")).always_run(),
    ]
}

fn build_env(settings: &BuildConfig) -> HashMap<String, String> {
    let mut env = HashMap::new();
    if let Some(master) = &settings.master_address {
        env.insert(
            "FAB_APT_PROXY".to_string(),
            format!("http://{master}:{}", settings.apt_proxy_port),
        );
        env.insert(
            "FAB_HTTP_PROXY".to_string(),
            format!("http://{master}:{}", settings.http_proxy_port),
        );
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApplianceName;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            appliance: ApplianceName::new("core").unwrap(),
            repository: "https://github.com/turnkeylinux-apps/core.git".to_string(),
            branch: "master".to_string(),
        }
    }

    #[test]
    fn pipeline_shape_and_policy_flags() {
        let steps = build_pipeline(&entry(), &BuildConfig::default());
        let summary: Vec<(&str, bool, bool)> = steps
            .iter()
            .map(|s| (s.name.as_str(), s.halt_on_failure, s.always_run))
            .collect();
        assert_eq!(
            summary,
            vec![
                (step_name::CLONE, true, false),
                (step_name::RESOLVE_INSTANCE, true, false),
                (step_name::ATTACH_VOLUME, true, false),
                (step_name::BUILD, true, false),
                (step_name::INSTALL, true, false),
                (step_name::CREATE_IMAGE, true, false),
                (step_name::DESTROY_VOLUME, false, true),
                (step_name::PRUNE_IMAGES, false, false),
                (step_name::CLEAN_DIRS, false, true),
            ]
        );
    }

    #[test]
    fn build_command_carries_device_placeholder_and_paths() {
        let steps = build_pipeline(&entry(), &BuildConfig::default());
        let StepKind::Shell { argv, .. } = &steps[3].kind else {
            panic!("step 4 must be a shell action");
        };
        assert!(argv.contains(&"{device}".to_string()));
        assert!(argv.contains(&"/mnt/core".to_string()));
        assert!(argv.contains(&"--build-only".to_string()));
    }

    #[test]
    fn proxy_env_set_only_with_master_address() {
        let mut settings = BuildConfig::default();
        assert!(build_env(&settings).is_empty());

        settings.master_address = Some("10.0.0.1".to_string());
        let env = build_env(&settings);
        assert_eq!(env["FAB_APT_PROXY"], "http://10.0.0.1:3142");
        assert_eq!(env["FAB_HTTP_PROXY"], "http://10.0.0.1:8124");
    }
}
