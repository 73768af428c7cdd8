// ABOUTME: Core domain types shared across the crate.
// ABOUTME: Typed ids, validated appliance names, and build timestamps.

mod appliance;
mod id;
mod stamp;

pub use appliance::{ApplianceName, ApplianceNameError};
pub use id::{Id, ImageId, InstanceId, SnapshotId, VolumeId, WorkerId};
pub use stamp::{BuildStamp, StampSource};
