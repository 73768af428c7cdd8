// ABOUTME: Test support utilities.
// ABOUTME: Scripted command runner and context builders for integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use fornax::build::{CancelToken, CloudStepParams, StepContext};
use fornax::catalog::CatalogEntry;
use fornax::cloud::MemoryCloud;
use fornax::types::{ApplianceName, InstanceId, StampSource};
use fornax::worker::{CommandError, CommandOutput, CommandRunner};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("fornax=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A command runner that never touches the host shell.
///
/// Every invocation is recorded. Commands succeed with a canned stdout
/// unless an argv fragment matches a scripted failure, panic, or
/// cancellation trigger.
#[derive(Default)]
pub struct FakeRunner {
    commands: Mutex<Vec<Vec<String>>>,
    fail_matching: Mutex<Option<(String, i32, String)>>,
    panic_matching: Mutex<Option<String>>,
    cancel_on: Mutex<Option<(String, CancelToken)>>,
}

#[allow(dead_code)]
impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any command whose argv contains `fragment`.
    pub fn fail_matching(&self, fragment: &str, exit_code: i32, stderr: &str) {
        *self.fail_matching.lock() = Some((fragment.into(), exit_code, stderr.into()));
    }

    /// Panic inside any command whose argv contains `fragment`.
    pub fn panic_matching(&self, fragment: &str) {
        *self.panic_matching.lock() = Some(fragment.into());
    }

    /// Trip `token` when a command whose argv contains `fragment` runs.
    pub fn cancel_on(&self, fragment: &str, token: CancelToken) {
        *self.cancel_on.lock() = Some((fragment.into(), token));
    }

    /// Every argv run so far, in order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().clone()
    }

    /// How many recorded commands contain `fragment`.
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|argv| argv.iter().any(|arg| arg.contains(fragment)))
            .count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        argv: &[String],
        _env: &HashMap<String, String>,
        _timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.commands.lock().push(argv.to_vec());

        let matches = |fragment: &str| argv.iter().any(|arg| arg.contains(fragment));

        if let Some(fragment) = self.panic_matching.lock().as_deref() {
            if matches(fragment) {
                panic!("scripted panic for {fragment}");
            }
        }
        if let Some((fragment, token)) = self.cancel_on.lock().as_ref() {
            if matches(fragment) {
                token.cancel();
            }
        }
        if let Some((fragment, exit_code, stderr)) = self.fail_matching.lock().as_ref() {
            if matches(fragment) {
                return Ok(CommandOutput {
                    exit_code: *exit_code,
                    stdout: String::new(),
                    stderr: stderr.clone(),
                });
            }
        }

        // Checkout steps read the revision off stdout.
        let stdout = if matches("rev-parse") {
            "f00dfeedf00dfeedf00dfeedf00dfeedf00dfeed\n".to_string()
        } else {
            String::new()
        };
        Ok(CommandOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        })
    }
}

#[allow(dead_code)]
pub fn appliance(name: &str) -> ApplianceName {
    ApplianceName::new(name).unwrap()
}

#[allow(dead_code)]
pub fn entry(name: &str) -> CatalogEntry {
    CatalogEntry {
        appliance: appliance(name),
        repository: format!("https://github.com/turnkeylinux-apps/{name}.git"),
        branch: "master".to_string(),
    }
}

/// A step context over a fresh in-memory cloud and the given runner,
/// with a pinned stamp so image names are deterministic.
#[allow(dead_code)]
pub fn memory_context(
    provider: Arc<MemoryCloud>,
    runner: Arc<FakeRunner>,
    stamp: &str,
) -> StepContext {
    StepContext::new(provider, runner, CloudStepParams::defaults("eu-west-2a"))
        .with_instance(InstanceId::new("i-test0001"))
        .with_stamps(StampSource::fixed(stamp))
        .with_action_timeout(Duration::from_secs(30))
}
