// ABOUTME: Factory configuration types and parsing for fornax.yml.
// ABOUTME: Cloud, worker, build, catalog, and trigger settings with defaults.

mod init;

pub use init::init_config;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cloud::{CloudConfig, Tags};
use crate::error::{Error, Result};

pub const CONFIG_FILENAME: &str = "fornax.yml";
pub const CONFIG_FILENAME_ALT: &str = "fornax.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct FactoryConfig {
    pub cloud: CloudConfig,

    #[serde(default)]
    pub workers: WorkerConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub triggers: TriggerConfig,
}

/// Worker provisioning settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Upper bound on worker instances; actual count is
    /// `min(appliance_count, max_instances)`.
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,

    /// Shell-style name pattern resolving the worker base image.
    /// Empty (with empty tags) skips resolution entirely.
    #[serde(default)]
    pub base_image_pattern: String,

    /// Tag filter applied alongside the name pattern.
    #[serde(default)]
    pub base_image_tags: Tags,

    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    #[serde(default = "default_password_min_len")]
    pub password_min_len: usize,

    #[serde(default = "default_password_max_len")]
    pub password_max_len: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("empty worker config must deserialize")
    }
}

fn default_max_instances() -> usize {
    4
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_password_min_len() -> usize {
    crate::password::DEFAULT_MIN_LEN
}

fn default_password_max_len() -> usize {
    crate::password::DEFAULT_MAX_LEN
}

/// Build pipeline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_volume_gib")]
    pub volume_gib: u32,

    #[serde(default = "default_image_arch")]
    pub image_arch: String,

    /// Base tags stamped on every object a build creates.
    #[serde(default = "default_object_tags")]
    pub object_tags: Tags,

    /// Mount point template; `{appliance}` is substituted.
    #[serde(default = "default_mount_point")]
    pub mount_point: String,

    /// Work directory template; `{appliance}` is substituted.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Directory the appliance sources are cloned under.
    #[serde(default = "default_products_dir")]
    pub products_dir: String,

    /// Base argv of the appliance build command.
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,

    /// Address of this factory host, for the worker-side proxies.
    #[serde(default)]
    pub master_address: Option<String>,

    #[serde(default = "default_apt_proxy_port")]
    pub apt_proxy_port: u16,

    #[serde(default = "default_http_proxy_port")]
    pub http_proxy_port: u16,

    /// Timeout for each shell-level action.
    #[serde(default = "default_action_timeout", with = "humantime_serde")]
    pub action_timeout: Duration,

    /// Image versions kept per appliance by the retention pruner.
    #[serde(default = "default_max_versions")]
    pub max_appliance_versions: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("empty build config must deserialize")
    }
}

fn default_volume_gib() -> u32 {
    10
}

fn default_image_arch() -> String {
    "x86_64".to_string()
}

fn default_object_tags() -> Tags {
    Tags::from([("slave".to_string(), "slave".to_string())])
}

fn default_mount_point() -> String {
    "/mnt/{appliance}".to_string()
}

fn default_work_dir() -> String {
    "/srv/{appliance}".to_string()
}

fn default_products_dir() -> String {
    "/turnkey/fab/products".to_string()
}

fn default_build_command() -> Vec<String> {
    vec!["build_ami".to_string(), "-v".to_string()]
}

fn default_apt_proxy_port() -> u16 {
    3142
}

fn default_http_proxy_port() -> u16 {
    8124
}

fn default_action_timeout() -> Duration {
    Duration::from_secs(3600)
}

fn default_max_versions() -> usize {
    4
}

/// Appliance catalog source settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    /// Local catalog file (tklapp.json format).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Remote marketplace base URL; when set, the catalog is fetched
    /// from `<url>/api/v1/appliances/?limit=0`.
    #[serde(default)]
    pub url: Option<String>,

    /// Where successful remote fetches are cached, and the fallback on
    /// fetch failure.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    #[serde(default = "default_marketplace_user_var")]
    pub username_var: String,

    #[serde(default = "default_marketplace_password_var")]
    pub password_var: String,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("tklapp.json")
}

fn default_marketplace_user_var() -> String {
    "FORNAX_MARKETPLACE_USER".to_string()
}

fn default_marketplace_password_var() -> String {
    "FORNAX_MARKETPLACE_PASSWORD".to_string()
}

/// Trigger settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TriggerConfig {
    /// Quiet period after a change before a build is dispatched.
    #[serde(default = "default_tree_stable_timer", with = "humantime_serde")]
    pub tree_stable_timer: Duration,

    /// Crontab record (`minute hour dom month dow`, int or `*`) for
    /// nightly builds; absent disables them.
    #[serde(default)]
    pub nightly_crontab: Option<String>,
}

fn default_tree_stable_timer() -> Duration {
    Duration::from_secs(120)
}

impl FactoryConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [dir.join(CONFIG_FILENAME), dir.join(CONFIG_FILENAME_ALT)];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }
}
