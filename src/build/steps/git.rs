// ABOUTME: Source checkout step: clone or update the appliance repository on the worker.
// ABOUTME: Records the checked-out revision as the got_revision property.

use tracing::info;

use super::run_action;
use crate::build::context::StepContext;
use crate::build::error::StepError;
use crate::build::properties::{PropertyBag, key};

/// Clone `repourl` at `branch` into `workdir`, updating an existing
/// checkout incrementally, then record the resulting revision.
pub async fn execute(
    ctx: &StepContext,
    bag: &mut PropertyBag,
    repourl: &str,
    branch: &str,
    workdir: &str,
) -> Result<(), StepError> {
    let checkout = format!(
        "if test -d {workdir}/.git; then \
           git -C {workdir} fetch origin {branch} && \
           git -C {workdir} checkout -B {branch} FETCH_HEAD && \
           git -C {workdir} submodule update --init --recursive; \
         else \
           git clone --recurse-submodules --branch {branch} {repourl} {workdir}; \
         fi"
    );
    let argv = vec!["sh".to_string(), "-c".to_string(), checkout];
    run_action(ctx, "checkout", &argv, &Default::default()).await?;

    let rev_argv = vec![
        "git".to_string(),
        "-C".to_string(),
        workdir.to_string(),
        "rev-parse".to_string(),
        "HEAD".to_string(),
    ];
    let output = run_action(ctx, "rev-parse", &rev_argv, &Default::default()).await?;
    let revision = output.stdout.trim().to_string();

    info!(repourl, branch, revision, "source checked out");
    bag.set(key::REPOURL, repourl);
    bag.set(key::BRANCH, branch);
    bag.set(key::GOT_REVISION, revision);
    Ok(())
}
