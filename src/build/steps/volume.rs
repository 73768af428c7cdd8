// ABOUTME: Volume lifecycle steps: attach a fresh scratch volume, destroy it afterwards.
// ABOUTME: Destroy is wired always_run in the pipeline so volumes cannot leak.

use tracing::{info, warn};

use crate::build::context::StepContext;
use crate::build::error::StepError;
use crate::build::properties::{PropertyBag, key};
use crate::cloud::{VolumeSpec, tag};
use crate::types::VolumeId;

/// Resolve the worker's cloud instance identity into the properties.
pub async fn resolve_instance(
    ctx: &StepContext,
    bag: &mut PropertyBag,
) -> Result<(), StepError> {
    let instance = ctx.instance.as_ref().ok_or(StepError::NoInstance)?;
    bag.set(key::INSTANCE_ID, instance.as_str());
    Ok(())
}

/// Attach a new scratch volume to the build's worker instance.
///
/// Sets `instance_id`, `volume_id`, `device`, and `volume_tags`.
pub async fn attach(ctx: &StepContext, bag: &mut PropertyBag) -> Result<(), StepError> {
    let instance = ctx.instance.as_ref().ok_or(StepError::NoInstance)?;

    let mut tags = ctx.params.object_tags.clone();
    tags.insert(tag::TIMESTAMP.to_string(), ctx.stamps.stamp().to_string());

    let spec = VolumeSpec {
        size_gib: ctx.params.volume_gib,
        zone: ctx.params.zone.clone(),
        tags: tags.clone(),
    };
    let attachment = ctx.provider.attach_volume(instance, &spec).await?;

    info!(
        volume = %attachment.volume_id,
        device = %attachment.device,
        instance = %instance,
        "attached build volume"
    );

    bag.set(key::INSTANCE_ID, instance.as_str());
    bag.set(key::VOLUME_ID, attachment.volume_id.as_str());
    bag.set(key::DEVICE, attachment.device.as_str());
    bag.set_tags(key::VOLUME_TAGS, &tags);
    Ok(())
}

/// Destroy the volume recorded in `volume_id`.
///
/// When no volume was ever attached there is nothing to clean up and the
/// step succeeds; leak-freedom only binds builds that reached attach.
pub async fn destroy(ctx: &StepContext, bag: &mut PropertyBag) -> Result<(), StepError> {
    let Some(volume_id) = bag.get_str(key::VOLUME_ID) else {
        warn!("no volume_id property set, nothing to destroy");
        return Ok(());
    };

    let volume = VolumeId::new(volume_id);
    ctx.provider.destroy_volume(&volume).await?;
    info!(volume = %volume, "destroyed build volume");
    Ok(())
}
