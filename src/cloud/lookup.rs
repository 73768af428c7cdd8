// ABOUTME: Image lookup and bulk deletion helpers over any CloudProvider.
// ABOUTME: Shell-style name patterns, newest-name-first ordering, independent deletes.

use regex::Regex;
use tracing::{info, warn};

use super::error::{LookupError, TeardownError};
use super::provider::CloudProvider;
use super::types::{ImageSummary, Tags};
use crate::types::ImageId;

/// Compile a shell-style pattern (`?`, `*`, `[seq]`, `[!seq]`) into an
/// anchored regex.
fn compile_pattern(pattern: &str) -> Result<Regex, LookupError> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '[' => {
                regex.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    regex.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == '\\' {
                        regex.push_str(r"\\");
                    } else {
                        regex.push(inner);
                    }
                    if inner == ']' {
                        break;
                    }
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');
    Regex::new(&regex).map_err(|e| LookupError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Find images by name pattern and/or tag filter.
///
/// An empty pattern matches every name. The result is sorted by name
/// descending, so with fixed-width stamp suffixes the newest image of an
/// appliance comes first.
pub async fn find_images<P: CloudProvider + ?Sized>(
    provider: &P,
    pattern: &str,
    tags: &Tags,
) -> Result<Vec<ImageSummary>, LookupError> {
    let mut images = provider.find_images(tags).await?;

    if !pattern.is_empty() {
        let matcher = compile_pattern(pattern)?;
        images.retain(|image| matcher.is_match(&image.name));
    }

    images.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(images)
}

/// Return the id of the newest image matching the pattern and tags.
///
/// Used to resolve the worker base image at startup; a missing image is a
/// hard error there, hence `NotFound` rather than an `Option`.
pub async fn get_image_id<P: CloudProvider + ?Sized>(
    provider: &P,
    pattern: &str,
    tags: &Tags,
) -> Result<ImageId, LookupError> {
    let images = find_images(provider, pattern, tags).await?;
    images
        .into_iter()
        .next()
        .map(|image| image.id)
        .ok_or_else(|| LookupError::NotFound {
            region: provider.region().to_string(),
            pattern: pattern.to_string(),
            tags: tags.clone(),
        })
}

/// Outcome of a bulk image deletion.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    pub deleted: Vec<ImageId>,
    pub failed: Vec<(ImageId, TeardownError)>,
}

impl DeleteOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deregister each image and delete its backing snapshot.
///
/// Every id is attempted; a failure on one never skips the rest.
pub async fn delete_images<P: CloudProvider + ?Sized>(
    provider: &P,
    ids: &[ImageId],
) -> DeleteOutcome {
    let mut outcome = DeleteOutcome::default();

    for id in ids {
        match provider.delete_image(id).await {
            Ok(()) => {
                info!(image = %id, "deleted image");
                outcome.deleted.push(id.clone());
            }
            Err(e) => {
                warn!(image = %id, error = %e, "failed to delete image");
                outcome.failed.push((id.clone(), e));
            }
        }
    }

    outcome
}
