// ABOUTME: Worker lifecycle states and the readiness ranking used for scheduling.
// ABOUTME: Higher rank means closer to accepting a build without warm-up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a build worker.
///
/// The transitional states (`Pinging`, `Attaching`, `Substantiating`) are
/// connection-establishment phases: a worker in one of them is usually
/// already committed to another build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Pinging,
    Attaching,
    Substantiating,
    Building,
    Latent,
    Idle,
}

impl WorkerState {
    /// Scheduling preference rank; strictly higher is preferred.
    ///
    /// Idle workers need no warm-up. Latent (provisionable but not yet
    /// running) beats Building so pending builds fan out across
    /// infrastructure instead of queueing behind a busy worker.
    pub fn readiness_rank(self) -> u8 {
        match self {
            WorkerState::Pinging => 0,
            WorkerState::Attaching => 1,
            WorkerState::Substantiating => 2,
            WorkerState::Building => 3,
            WorkerState::Latent => 4,
            WorkerState::Idle => 5,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Pinging => "pinging",
            WorkerState::Attaching => "attaching",
            WorkerState::Substantiating => "substantiating",
            WorkerState::Building => "building",
            WorkerState::Latent => "latent",
            WorkerState::Idle => "idle",
        };
        write!(f, "{name}")
    }
}
