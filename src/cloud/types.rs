// ABOUTME: Data types crossing the cloud-provider boundary.
// ABOUTME: Volume and image specs, summaries, and resource tags.

use crate::types::{VolumeId, ImageId};
use std::collections::BTreeMap;

/// Key/value tags attached to cloud resources.
///
/// A `BTreeMap` keeps iteration (and therefore filter construction and
/// logging) deterministic.
pub type Tags = BTreeMap<String, String>;

/// Tag keys the factory writes on every image it creates.
pub mod tag {
    pub const TIMESTAMP: &str = "timestamp";
    pub const APPLIANCE: &str = "appliance";
    pub const REPOURL: &str = "repourl";
    pub const BRANCH: &str = "branch";
    pub const REVISION: &str = "revision";
}

/// Request to provision and attach a scratch volume.
#[derive(Debug, Clone)]
pub struct VolumeSpec {
    pub size_gib: u32,
    pub zone: String,
    pub tags: Tags,
}

/// Result of a successful volume attach.
#[derive(Debug, Clone)]
pub struct VolumeAttachment {
    pub volume_id: VolumeId,
    /// Device path on the worker instance, e.g. `/dev/xvdb`.
    pub device: String,
}

/// Request to snapshot a volume into a machine image.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    pub name: String,
    pub volume_id: VolumeId,
    pub arch: String,
    pub description: Option<String>,
    pub tags: Tags,
}

/// One image as reported by the provider's listing.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub id: ImageId,
    pub name: String,
    pub tags: Tags,
}

impl ImageSummary {
    /// The `timestamp` tag, or empty when absent. Absent stamps sort
    /// before everything, making untagged images the first pruned.
    pub fn timestamp_tag(&self) -> &str {
        self.tags.get(tag::TIMESTAMP).map(String::as_str).unwrap_or("")
    }
}
