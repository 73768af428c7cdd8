// ABOUTME: Image retention pruning: keep the newest max_versions images per appliance.
// ABOUTME: Deletions are attempted independently; pruning never halts a pipeline.

use thiserror::Error;
use tracing::{error, info};

use crate::cloud::{self, CloudProvider, LookupError, Tags, TeardownError, tag};
use crate::types::{ApplianceName, ImageId};

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("could not list images for appliance {appliance}: {source}")]
    List {
        appliance: ApplianceName,
        source: LookupError,
    },
}

/// What a pruning pass did.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    /// Total images found for the appliance before pruning.
    pub examined: usize,
    pub deleted: Vec<ImageId>,
    pub failed: Vec<(ImageId, TeardownError)>,
}

impl PruneOutcome {
    pub fn fully_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete all but the `max_versions` newest images of an appliance.
///
/// Images are ordered by their `timestamp` tag; the fixed-width stamp
/// format makes lexical order chronological. Ties keep the provider's
/// listing order (stable sort). When the appliance has `max_versions` or
/// fewer images the deletion set is empty by construction; nothing is
/// ever deleted to "make room".
pub async fn prune_old_images<P: CloudProvider + ?Sized>(
    provider: &P,
    appliance: &ApplianceName,
    max_versions: usize,
) -> Result<PruneOutcome, PruneError> {
    let filter = Tags::from([(tag::APPLIANCE.to_string(), appliance.to_string())]);
    let mut images = provider
        .find_images(&filter)
        .await
        .map_err(|source| PruneError::List {
            appliance: appliance.clone(),
            source,
        })?;

    images.sort_by(|a, b| a.timestamp_tag().cmp(b.timestamp_tag()));

    let examined = images.len();
    let doomed: Vec<ImageId> = images
        .iter()
        .take(examined.saturating_sub(max_versions))
        .map(|image| image.id.clone())
        .collect();

    if doomed.is_empty() {
        info!(appliance = %appliance, examined, "no images to prune");
        return Ok(PruneOutcome {
            examined,
            ..Default::default()
        });
    }

    info!(
        appliance = %appliance,
        examined,
        pruning = doomed.len(),
        keeping = max_versions,
        "pruning old images"
    );

    let outcome = cloud::delete_images(provider, &doomed).await;
    if !outcome.failed.is_empty() {
        error!(
            appliance = %appliance,
            failed = outcome.failed.len(),
            "could not destroy some old images"
        );
    }

    Ok(PruneOutcome {
        examined,
        deleted: outcome.deleted,
        failed: outcome.failed,
    })
}
