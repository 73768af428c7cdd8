// ABOUTME: The cloud resource provider trait consumed by build steps.
// ABOUTME: Concrete SDK integrations implement this; the crate ships an in-memory backend.

use async_trait::async_trait;

use super::error::{ImageCreationError, LookupError, ProvisionError, TeardownError};
use super::types::{ImageSpec, ImageSummary, Tags, VolumeAttachment, VolumeSpec};
use crate::types::{ImageId, InstanceId, VolumeId};

/// Operations the build pipeline performs against the cloud.
///
/// Implementations must be safe to share across concurrently running
/// builds; each method owns exactly one provider round trip.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provision a new scratch volume and attach it to `instance`.
    async fn attach_volume(
        &self,
        instance: &InstanceId,
        spec: &VolumeSpec,
    ) -> Result<VolumeAttachment, ProvisionError>;

    /// Detach and delete a volume created by [`attach_volume`](Self::attach_volume).
    async fn destroy_volume(&self, volume: &VolumeId) -> Result<(), TeardownError>;

    /// Snapshot a volume into a registered machine image.
    async fn create_image(&self, spec: &ImageSpec) -> Result<ImageId, ImageCreationError>;

    /// List images whose tags contain every entry of `filter`.
    /// Ordering of the result is unspecified.
    async fn find_images(&self, filter: &Tags) -> Result<Vec<ImageSummary>, LookupError>;

    /// Deregister one image and delete its backing snapshot.
    ///
    /// Multi-image deletion lives in [`crate::cloud::delete_images`],
    /// which attempts every id independently.
    async fn delete_image(&self, image: &ImageId) -> Result<(), TeardownError>;

    /// Region this provider is connected to, for diagnostics.
    fn region(&self) -> &str;
}
