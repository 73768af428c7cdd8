// ABOUTME: Command execution seam for shell-level build actions.
// ABOUTME: SshRunner targets real workers; LocalRunner runs on the current host.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use super::ssh::{SshConfig, WorkerSession};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn command {command:?}: {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("ssh error: {0}")]
    Ssh(#[from] super::ssh::SshError),

    #[error("command terminated by signal")]
    Signalled,
}

/// Output from one executed build action.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes shell-level build actions on a worker.
///
/// The orchestrator only ever awaits these calls; the blocking work lives
/// inside the runner (remote shell or child process).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        argv: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// Runs actions as child processes on this host.
///
/// Used when the factory itself runs on the worker, and by tests.
#[derive(Debug, Default)]
pub struct LocalRunner;

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(
        &self,
        argv: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = async {
            command
                .output()
                .await
                .map_err(|e| CommandError::SpawnFailed {
                    command: program.clone(),
                    reason: e.to_string(),
                })
        };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(result) => result?,
            Err(_) => return Err(CommandError::Timeout(timeout)),
        };

        let exit_code = output.status.code().ok_or(CommandError::Signalled)?;
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Runs actions on a remote worker over SSH.
pub struct SshRunner {
    config: SshConfig,
}

impl SshRunner {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(
        &self,
        argv: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        if argv.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        // One session per action; build actions are minutes long, so
        // connection reuse buys nothing worth the state.
        let session = WorkerSession::connect(self.config.clone()).await?;
        let result = session.exec(&shell_command(argv, env), timeout).await;
        session.close().await;

        let output = result?;
        Ok(CommandOutput {
            exit_code: output.exit_code as i32,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Render an argv + env into a single remote shell command line.
fn shell_command(argv: &[String], env: &HashMap<String, String>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(env.len() + argv.len());
    // BTreeMap-style ordering for reproducible command lines.
    let mut env_sorted: Vec<_> = env.iter().collect();
    env_sorted.sort();
    for (key, value) in env_sorted {
        parts.push(format!("{key}={}", shell_quote(value)));
    }
    for arg in argv {
        parts.push(shell_quote(arg));
    }
    parts.join(" ")
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_command_quotes_and_orders_env() {
        let mut env = HashMap::new();
        env.insert("B".to_string(), "two words".to_string());
        env.insert("A".to_string(), "plain".to_string());
        let argv = vec!["build_ami".to_string(), "--device".to_string(), "/dev/xvdb".to_string()];
        assert_eq!(
            shell_command(&argv, &env),
            "A=plain B='two words' build_ami --device /dev/xvdb"
        );
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn local_runner_captures_output_and_exit_code() {
        let runner = LocalRunner;
        let argv = vec!["sh".to_string(), "-c".to_string(), "echo out; exit 3".to_string()];
        let output = runner
            .run(&argv, &HashMap::new(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn local_runner_times_out() {
        let runner = LocalRunner;
        let argv = vec!["sleep".to_string(), "5".to_string()];
        let err = runner
            .run(&argv, &HashMap::new(), Duration::from_millis(50))
            .await;
        assert!(matches!(err, Err(CommandError::Timeout(_))));
    }
}
