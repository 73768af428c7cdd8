// ABOUTME: Step-level error type.
// ABOUTME: Every provider or shell failure converts into this; none escapes a step.

use thiserror::Error;

use crate::cloud::{ImageCreationError, LookupError, ProvisionError, TeardownError};
use crate::retention::PruneError;
use crate::worker::CommandError;

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Teardown(#[from] TeardownError),

    #[error(transparent)]
    ImageCreation(#[from] ImageCreationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Prune(#[from] PruneError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("{action} failed with exit code {exit_code}: {stderr}")]
    ActionFailed {
        action: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("required property not set: {0}")]
    MissingProperty(&'static str),

    #[error("worker has no cloud instance identity")]
    NoInstance,
}
