// ABOUTME: Per-build result aggregation surfaced to the status layer.
// ABOUTME: One report per build: overall outcome plus every step's status and detail.

use super::step::StepStatus;
use crate::types::ApplianceName;

/// Overall result of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failure,
}

/// One step's final status within a build.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    /// Error text for failed steps.
    pub detail: Option<String>,
}

/// The aggregated result of a build, including cleanup-step outcomes so
/// leaked resources stay visible even when the primary build failed.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub appliance: ApplianceName,
    pub branch: String,
    pub outcome: BuildOutcome,
    pub cancelled: bool,
    pub steps: Vec<StepReport>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == BuildOutcome::Success
    }

    /// The first failed step, i.e. what gets named in the user-facing
    /// failure message.
    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Failure)
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.name == name)
    }
}
