// ABOUTME: Sequential step execution with halt-on-failure and always-run policy.
// ABOUTME: No step error or panic ever escapes; cleanup steps run under every outcome.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, info_span, warn};
use tracing::Instrument;

use super::context::{CancelToken, StepContext};
use super::properties::PropertyBag;
use super::report::{BuildOutcome, BuildReport, StepReport};
use super::step::{StepSpec, StepStatus};
use super::steps;
use crate::types::ApplianceName;

/// Run one build's step sequence to completion.
///
/// Steps execute strictly in order. After a halting failure (or once the
/// cancel token trips) remaining steps are skipped, except `always_run`
/// steps, which execute under every outcome so resources get cleaned up.
/// The overall result is a failure if any executed step failed.
pub async fn run_build(
    appliance: &ApplianceName,
    branch: &str,
    specs: &[StepSpec],
    ctx: &StepContext,
    bag: &mut PropertyBag,
    cancel: &CancelToken,
) -> BuildReport {
    let mut reports: Vec<StepReport> = Vec::with_capacity(specs.len());
    let mut halted = false;
    let mut any_failure = false;
    let mut was_cancelled = false;

    for spec in specs {
        if cancel.is_cancelled() && !was_cancelled {
            was_cancelled = true;
            warn!(appliance = %appliance, "build cancelled, running cleanup steps only");
        }

        if (halted || was_cancelled) && !spec.always_run {
            reports.push(StepReport {
                name: spec.name.clone(),
                status: StepStatus::Skipped,
                detail: None,
            });
            continue;
        }

        let span = info_span!("step", build = %appliance, step = %spec.name);
        let result = AssertUnwindSafe(steps::execute(&spec.kind, ctx, bag))
            .catch_unwind()
            .instrument(span)
            .await;

        let report = match result {
            Ok(Ok(())) => {
                info!(step = %spec.name, "step succeeded");
                StepReport {
                    name: spec.name.clone(),
                    status: StepStatus::Success,
                    detail: None,
                }
            }
            Ok(Err(e)) => {
                error!(step = %spec.name, error = %e, "step failed");
                StepReport {
                    name: spec.name.clone(),
                    status: StepStatus::Failure,
                    detail: Some(e.to_string()),
                }
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!(step = %spec.name, detail, "step panicked");
                StepReport {
                    name: spec.name.clone(),
                    status: StepStatus::Failure,
                    detail: Some(format!("step panicked: {detail}")),
                }
            }
        };

        if report.status == StepStatus::Failure {
            any_failure = true;
            if spec.halt_on_failure {
                halted = true;
            }
        }
        reports.push(report);
    }

    let outcome = if any_failure {
        BuildOutcome::Failure
    } else {
        BuildOutcome::Success
    };

    let report = BuildReport {
        appliance: appliance.clone(),
        branch: branch.to_string(),
        outcome,
        cancelled: was_cancelled,
        steps: reports,
    };

    match report.first_failure() {
        Some(failed) => error!(
            appliance = %appliance,
            branch,
            step = %failed.name,
            detail = failed.detail.as_deref().unwrap_or(""),
            "build failed"
        ),
        None => info!(appliance = %appliance, branch, "build succeeded"),
    }

    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
