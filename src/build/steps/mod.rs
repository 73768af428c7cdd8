// ABOUTME: Step execution: dispatch over the closed StepKind set.
// ABOUTME: Shared helper for running shell actions through the worker's command runner.

mod git;
mod image;
mod shell;
mod volume;

pub use shell::interpolate;

use std::collections::HashMap;
use tracing::debug;

use super::context::StepContext;
use super::error::StepError;
use super::properties::PropertyBag;
use super::step::StepKind;
use crate::worker::CommandOutput;

/// Execute one step kind against the shared context and property bag.
pub async fn execute(
    kind: &StepKind,
    ctx: &StepContext,
    bag: &mut PropertyBag,
) -> Result<(), StepError> {
    match kind {
        StepKind::GitClone {
            repourl,
            branch,
            workdir,
        } => git::execute(ctx, bag, repourl, branch, workdir).await,
        StepKind::ResolveInstance => volume::resolve_instance(ctx, bag).await,
        StepKind::AttachVolume => volume::attach(ctx, bag).await,
        StepKind::Shell { argv, env } => shell::execute(ctx, bag, "shell action", argv, env).await,
        StepKind::CreateImage { appliance, repourl } => {
            image::create(ctx, bag, appliance, repourl).await
        }
        StepKind::DestroyVolume => volume::destroy(ctx, bag).await,
        StepKind::PruneImages {
            appliance,
            max_versions,
        } => image::prune(ctx, bag, appliance, *max_versions).await,
    }
}

/// Run an argv through the context's command runner, turning a non-zero
/// exit into a step failure carrying the stderr tail.
pub(crate) async fn run_action(
    ctx: &StepContext,
    action: &str,
    argv: &[String],
    env: &HashMap<String, String>,
) -> Result<CommandOutput, StepError> {
    debug!(action, ?argv, "running action");
    let output = ctx.runner.run(argv, env, ctx.action_timeout).await?;

    if !output.success() {
        return Err(StepError::ActionFailed {
            action: action.to_string(),
            exit_code: output.exit_code,
            stderr: tail(&output.stderr, 2000),
        });
    }
    Ok(output)
}

fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let start = text.len() - max;
        // Avoid splitting a UTF-8 sequence.
        let start = (start..text.len())
            .find(|i| text.is_char_boundary(*i))
            .unwrap_or(start);
        format!("...{}", &text[start..])
    }
}
