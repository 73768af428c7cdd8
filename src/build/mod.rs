// ABOUTME: The build engine: property bag, step definitions, execution context, orchestrator.
// ABOUTME: One build = one worker + one ordered step sequence + one property bag.

mod context;
mod error;
mod orchestrator;
mod properties;
mod report;
mod step;
mod steps;

pub use context::{CancelToken, CloudStepParams, StepContext};
pub use error::StepError;
pub use orchestrator::run_build;
pub use properties::{PropertyBag, key};
pub use report::{BuildOutcome, BuildReport, StepReport};
pub use step::{StepKind, StepSpec, StepStatus};
pub use steps::{execute as execute_step, interpolate};
