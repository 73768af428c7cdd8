// ABOUTME: Shared execution context injected once per build.
// ABOUTME: Provider handle, command runner, cloud parameters, stamp source, cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cloud::{CloudProvider, Tags};
use crate::types::{InstanceId, StampSource};
use crate::worker::CommandRunner;

/// Cloud parameters common to every cloud-touching step of a build.
#[derive(Debug, Clone)]
pub struct CloudStepParams {
    /// Availability zone scratch volumes are created in.
    pub zone: String,
    pub volume_gib: u32,
    /// Base tags stamped onto every object the build creates.
    pub object_tags: Tags,
    pub image_arch: String,
}

impl CloudStepParams {
    pub fn defaults(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            volume_gib: 10,
            object_tags: Tags::from([("slave".to_string(), "slave".to_string())]),
            image_arch: "x86_64".to_string(),
        }
    }
}

/// Cooperative cancellation flag checked between steps.
///
/// Cancellation never interrupts a step mid-flight; the orchestrator
/// observes the flag at the next step boundary and falls through to the
/// `always_run` cleanup steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Everything a step needs besides the property bag.
#[derive(Clone)]
pub struct StepContext {
    pub provider: Arc<dyn CloudProvider>,
    pub runner: Arc<dyn CommandRunner>,
    pub params: CloudStepParams,
    pub stamps: StampSource,
    /// Cloud instance backing the worker this build leased, when known.
    pub instance: Option<InstanceId>,
    /// Timeout applied to each shell-level action.
    pub action_timeout: Duration,
}

impl StepContext {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        runner: Arc<dyn CommandRunner>,
        params: CloudStepParams,
    ) -> Self {
        Self {
            provider,
            runner,
            params,
            stamps: StampSource::Wallclock,
            instance: None,
            action_timeout: Duration::from_secs(3600),
        }
    }

    pub fn with_instance(mut self, instance: InstanceId) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn with_stamps(mut self, stamps: StampSource) -> Self {
        self.stamps = stamps;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }
}
