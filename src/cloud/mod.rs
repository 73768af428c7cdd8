// ABOUTME: Cloud resource provider boundary: trait, types, errors, backends.
// ABOUTME: Build steps and the pruner consume cloud access only through this module.

mod config;
mod error;
mod lookup;
mod memory;
mod provider;
mod types;

pub use config::{CloudBackend, CloudConfig, Credentials};
pub use error::{
    CloudError, CloudErrorKind, ImageCreationError, LookupError, ProvisionError, TeardownError,
};
pub use lookup::{DeleteOutcome, delete_images, find_images, get_image_id};
pub use memory::{FailureInjection, MemoryCloud};
pub use provider::CloudProvider;
pub use types::{ImageSpec, ImageSummary, Tags, VolumeAttachment, VolumeSpec, tag};
