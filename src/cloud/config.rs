// ABOUTME: Cloud connection configuration passed into provider constructors.
// ABOUTME: Explicit struct, no ambient globals; credentials come from the environment.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Which provider implementation backs the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CloudBackend {
    /// In-process backend for development and tests.
    #[default]
    Memory,
    /// A real SDK integration supplied by the embedding application.
    External,
}

/// Connection settings handed to a [`CloudProvider`](super::CloudProvider)
/// constructor. Every provider instance owns its own copy; there is no
/// process-wide region or credential state.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    pub region: String,

    /// Availability zone volumes are provisioned in.
    pub zone: String,

    #[serde(default)]
    pub backend: CloudBackend,

    /// Environment variable holding the API access key id.
    #[serde(default = "default_access_key_var")]
    pub access_key_var: String,

    /// Environment variable holding the API secret key.
    #[serde(default = "default_secret_key_var")]
    pub secret_key_var: String,
}

fn default_access_key_var() -> String {
    "FORNAX_ACCESS_KEY_ID".to_string()
}

fn default_secret_key_var() -> String {
    "FORNAX_SECRET_ACCESS_KEY".to_string()
}

/// Resolved API credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

// Debug that does not leak the secret into logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl CloudConfig {
    /// Read credentials from the configured environment variables.
    ///
    /// Only external backends need credentials; the memory backend never
    /// calls this.
    pub fn credentials(&self) -> Result<Credentials> {
        let access_key_id = std::env::var(&self.access_key_var)
            .map_err(|_| Error::MissingEnvVar(self.access_key_var.clone()))?;
        let secret_access_key = std::env::var(&self.secret_key_var)
            .map_err(|_| Error::MissingEnvVar(self.secret_key_var.clone()))?;
        Ok(Credentials {
            access_key_id,
            secret_access_key,
        })
    }
}
