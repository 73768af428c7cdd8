// ABOUTME: Appliance catalog: the (appliance, repository, branch) list driving pipelines.
// ABOUTME: Remote marketplace fetch with cache fallback; never fatal at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::CatalogConfig;
use crate::types::ApplianceName;

const APPLIANCES_PATH: &str = "/api/v1/appliances/?limit=0";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("fetching appliance list from {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("appliance list payload is malformed: {0}")]
    BadPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One catalog row: an appliance built from a repository branch.
///
/// Serialized as a `[name, repository, branch]` triple, the on-disk
/// format of the appliance list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(String, String, String)", into = "(String, String, String)")]
pub struct CatalogEntry {
    pub appliance: ApplianceName,
    pub repository: String,
    pub branch: String,
}

impl TryFrom<(String, String, String)> for CatalogEntry {
    type Error = crate::types::ApplianceNameError;

    fn try_from(value: (String, String, String)) -> Result<Self, Self::Error> {
        Ok(Self {
            appliance: ApplianceName::new(&value.0)?,
            repository: value.1,
            branch: value.2,
        })
    }
}

impl From<CatalogEntry> for (String, String, String) {
    fn from(entry: CatalogEntry) -> Self {
        (
            entry.appliance.to_string(),
            entry.repository,
            entry.branch,
        )
    }
}

/// Read a catalog file. A missing file yields an empty catalog, matching
/// the behavior installations rely on before their first sync.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    info!(path = %path.display(), "reading appliance catalog");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a catalog file in the `[name, repository, branch]` triple format.
pub fn write_catalog(path: &Path, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Marketplace row shape inside the `objects` array.
#[derive(Debug, Deserialize)]
struct MarketplaceAppliance {
    name: String,
    repository: String,
    branch: String,
}

#[derive(Debug, Deserialize)]
struct MarketplacePayload {
    objects: Option<Vec<MarketplaceAppliance>>,
}

/// Fetch the appliance list from a marketplace host.
pub async fn fetch_catalog(
    base_url: &str,
    auth: Option<(&str, &str)>,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), APPLIANCES_PATH);

    let client = reqwest::Client::new();
    let mut request = client.get(&url);
    if let Some((username, password)) = auth {
        request = request.basic_auth(username, Some(password));
    }

    let response = request.send().await.map_err(|e| CatalogError::Fetch {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::Fetch {
            url,
            reason: format!("HTTP {status}: {body}"),
        });
    }

    let payload: MarketplacePayload =
        response.json().await.map_err(|e| CatalogError::Fetch {
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let objects = payload
        .objects
        .ok_or_else(|| CatalogError::BadPayload("missing \"objects\" item".to_string()))?;

    objects
        .into_iter()
        .map(|o| {
            CatalogEntry::try_from((o.name, o.repository, o.branch))
                .map_err(|e| CatalogError::BadPayload(e.to_string()))
        })
        .collect()
}

/// Load the catalog per configuration.
///
/// Remote-first when a URL is configured: a successful fetch refreshes
/// the cache file; a failed fetch falls back to the cache; no cache means
/// an empty catalog plus an error log. Never returns an error to the
/// caller; catalog problems must not abort startup.
pub async fn load_catalog(config: &CatalogConfig) -> Vec<CatalogEntry> {
    if let Some(url) = &config.url {
        let username = std::env::var(&config.username_var).ok();
        let password = std::env::var(&config.password_var).ok();
        let auth = match (&username, &password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        };

        match fetch_catalog(url, auth).await {
            Ok(entries) => {
                if let Err(e) = write_catalog(&config.cache_path, &entries) {
                    warn!(error = %e, "could not refresh catalog cache");
                }
                return entries;
            }
            Err(e) => {
                warn!(error = %e, "remote catalog fetch failed, falling back to cache");
                match read_catalog(&config.cache_path) {
                    Ok(entries) if !entries.is_empty() => return entries,
                    Ok(_) => {
                        error!("no cached appliance catalog available, starting with empty list");
                        return Vec::new();
                    }
                    Err(e) => {
                        error!(error = %e, "cached appliance catalog unreadable, starting with empty list");
                        return Vec::new();
                    }
                }
            }
        }
    }

    let path = config.path.as_deref().unwrap_or(&config.cache_path);
    match read_catalog(path) {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, "appliance catalog unreadable, starting with empty list");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_as_triple() {
        let json = r#"[["core", "https://github.com/turnkeylinux-apps/core.git", "master"]]"#;
        let entries: Vec<CatalogEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].appliance.as_str(), "core");
        assert_eq!(entries[0].branch, "master");

        let back = serde_json::to_string(&entries).unwrap();
        let reparsed: Vec<CatalogEntry> = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, entries);
    }

    #[test]
    fn invalid_appliance_name_is_rejected() {
        let json = r#"[["Not Valid", "repo", "master"]]"#;
        assert!(serde_json::from_str::<Vec<CatalogEntry>>(json).is_err());
    }
}
