// ABOUTME: In-memory cloud provider for development runs and tests.
// ABOUTME: Tracks volume/image lifecycles and supports per-operation failure injection.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::config::CloudConfig;
use super::error::{ImageCreationError, LookupError, ProvisionError, TeardownError};
use super::provider::CloudProvider;
use super::types::{ImageSpec, ImageSummary, Tags, VolumeAttachment, VolumeSpec};
use crate::types::{ImageId, InstanceId, SnapshotId, VolumeId};

#[derive(Debug, Clone)]
struct VolumeRecord {
    attached_to: InstanceId,
    device: String,
    tags: Tags,
}

#[derive(Debug, Clone)]
struct ImageRecord {
    name: String,
    tags: Tags,
    snapshot: SnapshotId,
}

#[derive(Default)]
struct State {
    volumes: BTreeMap<VolumeId, VolumeRecord>,
    images: Vec<(ImageId, ImageRecord)>,
    snapshots: Vec<SnapshotId>,
    destroyed_volumes: Vec<VolumeId>,
    volume_seq: u32,
    image_seq: u32,
}

/// Which operations the backend should fail, for exercising error paths.
#[derive(Debug, Default, Clone)]
pub struct FailureInjection {
    pub attach_volume: bool,
    pub destroy_volume: bool,
    pub create_image: bool,
    pub find_images: bool,
    pub delete_image: bool,
}

/// In-process [`CloudProvider`] backed by plain maps.
///
/// The dev/test stand-in for a real SDK integration. Beyond the trait it
/// exposes inspection helpers (`live_volumes`, `destroyed_volumes`,
/// `image_count`) that leak-freedom and retention tests assert against.
pub struct MemoryCloud {
    region: String,
    state: Mutex<State>,
    failures: Mutex<FailureInjection>,
}

impl MemoryCloud {
    pub fn new(config: &CloudConfig) -> Self {
        Self {
            region: config.region.clone(),
            state: Mutex::new(State::default()),
            failures: Mutex::new(FailureInjection::default()),
        }
    }

    /// Provider for tests, without a full config.
    pub fn for_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: Mutex::new(State::default()),
            failures: Mutex::new(FailureInjection::default()),
        }
    }

    pub fn set_failures(&self, failures: FailureInjection) {
        *self.failures.lock() = failures;
    }

    /// Seed an image directly, bypassing the volume lifecycle.
    pub fn seed_image(&self, name: &str, tags: Tags) -> ImageId {
        let mut state = self.state.lock();
        state.image_seq += 1;
        let id = ImageId::new(format!("ami-{:08x}", state.image_seq));
        let snapshot = SnapshotId::new(format!("snap-{:08x}", state.image_seq));
        state.snapshots.push(snapshot.clone());
        state.images.push((
            id.clone(),
            ImageRecord {
                name: name.to_string(),
                tags,
                snapshot,
            },
        ));
        id
    }

    /// Volume ids currently attached (not yet destroyed).
    pub fn live_volumes(&self) -> Vec<VolumeId> {
        self.state.lock().volumes.keys().cloned().collect()
    }

    /// Tags of a still-attached volume.
    pub fn volume_tags(&self, volume: &VolumeId) -> Option<Tags> {
        self.state
            .lock()
            .volumes
            .get(volume)
            .map(|record| record.tags.clone())
    }

    /// Instance a still-attached volume is bound to.
    pub fn volume_instance(&self, volume: &VolumeId) -> Option<InstanceId> {
        self.state
            .lock()
            .volumes
            .get(volume)
            .map(|record| record.attached_to.clone())
    }

    /// Volume ids destroyed so far, in destruction order.
    pub fn destroyed_volumes(&self) -> Vec<VolumeId> {
        self.state.lock().destroyed_volumes.clone()
    }

    pub fn image_count(&self) -> usize {
        self.state.lock().images.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.state.lock().snapshots.len()
    }
}

#[async_trait]
impl CloudProvider for MemoryCloud {
    async fn attach_volume(
        &self,
        instance: &InstanceId,
        spec: &VolumeSpec,
    ) -> Result<VolumeAttachment, ProvisionError> {
        if self.failures.lock().attach_volume {
            return Err(ProvisionError::NoCapacity(spec.zone.clone()));
        }

        let mut state = self.state.lock();
        state.volume_seq += 1;
        let volume_id = VolumeId::new(format!("vol-{:08x}", state.volume_seq));
        // xvdb, xvdc, ... wrapping is unrealistic enough to not matter here.
        let letter = (b'b' + ((state.volume_seq - 1) % 24) as u8) as char;
        let device = format!("/dev/xvd{letter}");
        state.volumes.insert(
            volume_id.clone(),
            VolumeRecord {
                attached_to: instance.clone(),
                device: device.clone(),
                tags: spec.tags.clone(),
            },
        );
        Ok(VolumeAttachment { volume_id, device })
    }

    async fn destroy_volume(&self, volume: &VolumeId) -> Result<(), TeardownError> {
        if self.failures.lock().destroy_volume {
            return Err(TeardownError::Failed("injected destroy failure".into()));
        }

        let mut state = self.state.lock();
        if state.volumes.remove(volume).is_none() {
            return Err(TeardownError::VolumeNotFound(volume.to_string()));
        }
        state.destroyed_volumes.push(volume.clone());
        Ok(())
    }

    async fn create_image(&self, spec: &ImageSpec) -> Result<ImageId, ImageCreationError> {
        if self.failures.lock().create_image {
            return Err(ImageCreationError::Failed("injected image failure".into()));
        }

        let mut state = self.state.lock();
        if !state.volumes.contains_key(&spec.volume_id) {
            return Err(ImageCreationError::VolumeNotFound(spec.volume_id.to_string()));
        }
        if state.images.iter().any(|(_, rec)| rec.name == spec.name) {
            return Err(ImageCreationError::NameTaken(spec.name.clone()));
        }
        state.image_seq += 1;
        let id = ImageId::new(format!("ami-{:08x}", state.image_seq));
        let snapshot = SnapshotId::new(format!("snap-{:08x}", state.image_seq));
        state.snapshots.push(snapshot.clone());
        state.images.push((
            id.clone(),
            ImageRecord {
                name: spec.name.clone(),
                tags: spec.tags.clone(),
                snapshot,
            },
        ));
        Ok(id)
    }

    async fn find_images(&self, filter: &Tags) -> Result<Vec<ImageSummary>, LookupError> {
        if self.failures.lock().find_images {
            return Err(LookupError::ListFailed("injected listing failure".into()));
        }

        let state = self.state.lock();
        Ok(state
            .images
            .iter()
            .filter(|(_, rec)| {
                filter
                    .iter()
                    .all(|(k, v)| rec.tags.get(k).is_some_and(|tag| tag == v))
            })
            .map(|(id, rec)| ImageSummary {
                id: id.clone(),
                name: rec.name.clone(),
                tags: rec.tags.clone(),
            })
            .collect())
    }

    async fn delete_image(&self, image: &ImageId) -> Result<(), TeardownError> {
        if self.failures.lock().delete_image {
            return Err(TeardownError::Failed("injected delete failure".into()));
        }

        let mut state = self.state.lock();
        let Some(pos) = state.images.iter().position(|(id, _)| id == image) else {
            return Err(TeardownError::ImageNotFound(image.to_string()));
        };
        let (_, record) = state.images.remove(pos);
        state.snapshots.retain(|snap| snap != &record.snapshot);
        Ok(())
    }

    fn region(&self) -> &str {
        &self.region
    }
}
