// ABOUTME: Error types for cloud-provider operations.
// ABOUTME: One enum per operation family, plus a SNAFU-unified wrapper with kinds.

use snafu::Snafu;
use thiserror::Error;

/// Volume provisioning (create + attach) failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("volume creation failed: {0}")]
    CreateFailed(String),

    #[error("volume attach to instance {instance} failed: {reason}")]
    AttachFailed { instance: String, reason: String },

    #[error("no capacity in zone {0}")]
    NoCapacity(String),
}

/// Resource teardown (volume destroy, image deregister) failures.
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("volume {0} not found")]
    VolumeNotFound(String),

    #[error("volume {volume} is still in use: {reason}")]
    VolumeInUse { volume: String, reason: String },

    #[error("image {0} not found")]
    ImageNotFound(String),

    #[error("teardown failed: {0}")]
    Failed(String),
}

/// Image creation (volume snapshot + registration) failures.
#[derive(Debug, Error)]
pub enum ImageCreationError {
    #[error("volume {0} not found")]
    VolumeNotFound(String),

    #[error("image name {0} already registered")]
    NameTaken(String),

    #[error("image creation failed: {0}")]
    Failed(String),
}

/// Image listing and lookup failures.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no image matches region={region} pattern={pattern:?} tags={tags:?}")]
    NotFound {
        region: String,
        pattern: String,
        tags: crate::cloud::Tags,
    },

    #[error("invalid name pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("image listing failed: {0}")]
    ListFailed(String),
}

/// Unified cloud error for callers that handle all operation families
/// through one path (step reporting, CLI exit codes).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CloudError {
    #[snafu(display("provisioning failed: {source}"))]
    Provision { source: ProvisionError },

    #[snafu(display("teardown failed: {source}"))]
    Teardown { source: TeardownError },

    #[snafu(display("image creation failed: {source}"))]
    ImageCreation { source: ImageCreationError },

    #[snafu(display("image lookup failed: {source}"))]
    Lookup { source: LookupError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    Provision,
    Teardown,
    ImageCreation,
    Lookup,
    NotFound,
}

impl CloudError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> CloudErrorKind {
        match self {
            CloudError::Provision { .. } => CloudErrorKind::Provision,
            CloudError::Teardown { .. } => CloudErrorKind::Teardown,
            CloudError::ImageCreation { .. } => CloudErrorKind::ImageCreation,
            CloudError::Lookup {
                source: LookupError::NotFound { .. },
            } => CloudErrorKind::NotFound,
            CloudError::Lookup { .. } => CloudErrorKind::Lookup,
        }
    }
}

impl From<ProvisionError> for CloudError {
    fn from(source: ProvisionError) -> Self {
        CloudError::Provision { source }
    }
}

impl From<TeardownError> for CloudError {
    fn from(source: TeardownError) -> Self {
        CloudError::Teardown { source }
    }
}

impl From<ImageCreationError> for CloudError {
    fn from(source: ImageCreationError) -> Self {
        CloudError::ImageCreation { source }
    }
}

impl From<LookupError> for CloudError {
    fn from(source: LookupError) -> Self {
        CloudError::Lookup { source }
    }
}
