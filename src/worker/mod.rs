// ABOUTME: Build workers: states, scheduling, pooling, and command execution.
// ABOUTME: One worker runs exactly one build at a time, leased from the shared pool.

mod pool;
mod runner;
mod scheduler;
mod ssh;
mod state;

pub use pool::{Worker, WorkerLease, WorkerPool};
pub use runner::{CommandError, CommandOutput, CommandRunner, LocalRunner, SshRunner};
pub use scheduler::{Candidate, select_worker};
pub use ssh::{ExecOutput, SshConfig, SshError, WorkerSession};
pub use state::WorkerState;

use crate::password::generate_password;
use crate::types::WorkerId;

/// Provision worker records for the factory.
///
/// The original system caps worker count at
/// `min(appliance_count, max_instances)`; every worker gets a zero-padded
/// name and a fresh secret.
pub fn provision_workers(
    appliance_count: usize,
    max_instances: usize,
    password_len: (usize, usize),
) -> Vec<Worker> {
    let count = appliance_count.min(max_instances);
    (0..count)
        .map(|n| {
            let name = format!("worker_{n:03}");
            Worker {
                id: WorkerId::new(name),
                state: WorkerState::Latent,
                instance: None,
                address: None,
                password: generate_password(password_len.0, password_len.1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_capped_by_max_instances() {
        assert_eq!(provision_workers(10, 3, (8, 8)).len(), 3);
        assert_eq!(provision_workers(2, 3, (8, 8)).len(), 2);
        assert!(provision_workers(0, 3, (8, 8)).is_empty());
    }

    #[test]
    fn worker_names_are_zero_padded_and_unique() {
        let workers = provision_workers(3, 3, (8, 8));
        let names: Vec<_> = workers.iter().map(|w| w.id.as_str().to_string()).collect();
        assert_eq!(names, vec!["worker_000", "worker_001", "worker_002"]);
        assert_ne!(workers[0].password, workers[1].password);
    }
}
