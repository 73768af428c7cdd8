// ABOUTME: Step definitions: the closed set of step kinds plus execution policy flags.
// ABOUTME: Step definitions are immutable; execution status lives in the per-build report.

use serde::Deserialize;
use std::collections::HashMap;

use crate::types::ApplianceName;

/// The closed set of step kinds the pipeline can run.
///
/// Tagged for serde so pipelines can also be declared as data; the tag
/// doubles as the step registry mapping kind names to constructors.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Clone (or update) the appliance source at a branch.
    GitClone {
        repourl: String,
        branch: String,
        workdir: String,
    },

    /// Record the worker's cloud instance identity into the properties.
    ResolveInstance,

    /// Provision and attach a fresh scratch volume.
    AttachVolume,

    /// Run a shell-level action on the worker. Arguments may reference
    /// properties as `{name}` placeholders (e.g. `{device}`).
    Shell {
        argv: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },

    /// Snapshot the scratch volume into a machine image.
    CreateImage {
        appliance: ApplianceName,
        repourl: String,
    },

    /// Destroy the scratch volume recorded in `volume_id`.
    DestroyVolume,

    /// Delete old image versions of an appliance.
    PruneImages {
        appliance: ApplianceName,
        max_versions: usize,
    },
}

/// One step definition: a kind plus execution policy.
#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    pub name: String,

    /// A failure of this step skips all later non-`always_run` steps.
    #[serde(default)]
    pub halt_on_failure: bool,

    /// Execute even after a halting failure or cancellation.
    #[serde(default)]
    pub always_run: bool,

    #[serde(flatten)]
    pub kind: StepKind,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            halt_on_failure: false,
            always_run: false,
            kind,
        }
    }

    pub fn halt_on_failure(mut self) -> Self {
        self.halt_on_failure = true;
        self
    }

    pub fn always_run(mut self) -> Self {
        self.always_run = true;
        self
    }
}

/// Execution status of one step within a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failure,
    /// Not run because an earlier halting failure (or cancellation)
    /// short-circuited the sequence.
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepStatus::Success => "success",
            StepStatus::Failure => "failure",
            StepStatus::Skipped => "skipped",
        };
        write!(f, "{name}")
    }
}
