// ABOUTME: Image steps: snapshot the scratch volume into a machine image, prune old versions.
// ABOUTME: Image names are `<appliance>_<stamp>`; tags carry full build provenance.

use serde_json::Value;
use tracing::info;

use crate::build::context::StepContext;
use crate::build::error::StepError;
use crate::build::properties::{PropertyBag, key};
use crate::cloud::{ImageSpec, tag};
use crate::retention;
use crate::types::{ApplianceName, VolumeId};

/// Create an image from the build volume.
///
/// Reads `branch`, `got_revision`, `volume_id` (required) and
/// `description`, `custom_tags` (optional) from the properties; sets
/// `image_id`, `image_name`, `image_tags`.
pub async fn create(
    ctx: &StepContext,
    bag: &mut PropertyBag,
    appliance: &ApplianceName,
    repourl: &str,
) -> Result<(), StepError> {
    let branch = bag
        .get_str(key::BRANCH)
        .ok_or(StepError::MissingProperty(key::BRANCH))?
        .to_string();
    let revision = bag
        .get_str(key::GOT_REVISION)
        .ok_or(StepError::MissingProperty(key::GOT_REVISION))?
        .to_string();
    let volume_id = bag
        .get_str(key::VOLUME_ID)
        .ok_or(StepError::MissingProperty(key::VOLUME_ID))?
        .to_string();

    let description = bag.get_str(key::DESCRIPTION).map(str::to_string);

    let stamp = ctx.stamps.stamp();
    let image_name = format!("{appliance}_{stamp}");

    // Custom tags first so the factory's provenance tags win on conflict.
    let mut tags = bag.get_tags(key::CUSTOM_TAGS);
    tags.insert(tag::TIMESTAMP.to_string(), stamp.to_string());
    tags.insert(tag::APPLIANCE.to_string(), appliance.to_string());
    tags.insert(tag::REPOURL.to_string(), repourl.to_string());
    tags.insert(tag::BRANCH.to_string(), branch);
    tags.insert(tag::REVISION.to_string(), revision);

    let spec = ImageSpec {
        name: image_name.clone(),
        volume_id: VolumeId::new(volume_id),
        arch: ctx.params.image_arch.clone(),
        description,
        tags: tags.clone(),
    };
    let image_id = ctx.provider.create_image(&spec).await?;

    info!(image = %image_id, name = %image_name, "created image");
    bag.set(key::IMAGE_ID, image_id.as_str());
    bag.set(key::IMAGE_NAME, image_name);
    bag.set_tags(key::IMAGE_TAGS, &tags);
    Ok(())
}

/// Prune old image versions of this appliance.
///
/// A partial deletion failure is a step failure, but the images that
/// could be deleted are already gone; retrying next build converges.
pub async fn prune(
    ctx: &StepContext,
    bag: &mut PropertyBag,
    appliance: &ApplianceName,
    max_versions: usize,
) -> Result<(), StepError> {
    let outcome = retention::prune_old_images(ctx.provider.as_ref(), appliance, max_versions).await?;

    bag.set(
        "pruned_images",
        Value::from(
            outcome
                .deleted
                .iter()
                .map(|id| id.as_str().to_string())
                .collect::<Vec<_>>(),
        ),
    );

    if !outcome.fully_succeeded() {
        let (first_id, first_err) = &outcome.failed[0];
        return Err(StepError::ActionFailed {
            action: "prune-images".to_string(),
            exit_code: 1,
            stderr: format!(
                "{} of {} deletions failed, first: {first_id}: {first_err}",
                outcome.failed.len(),
                outcome.failed.len() + outcome.deleted.len(),
            ),
        });
    }
    Ok(())
}
