// ABOUTME: Shared pool of build workers with exclusive leasing.
// ABOUTME: Acquisition goes through the scheduling heuristic; leases return on drop.

use nonempty::NonEmpty;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

use super::scheduler::{Candidate, select_worker};
use super::state::WorkerState;
use crate::types::{InstanceId, WorkerId};

/// A registered build worker.
#[derive(Debug, Clone)]
pub struct Worker {
    pub id: WorkerId,
    pub state: WorkerState,
    /// Cloud instance backing this worker, once known.
    pub instance: Option<InstanceId>,
    /// Address the build actions connect to.
    pub address: Option<String>,
    /// Authentication secret handed to the worker at provisioning time.
    pub password: String,
}

impl Worker {
    pub fn new(id: impl Into<String>, state: WorkerState) -> Self {
        Self {
            id: WorkerId::new(id),
            state,
            instance: None,
            address: None,
            password: String::new(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(InstanceId::new(instance));
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }
}

struct Slot {
    worker: Worker,
    leased: bool,
}

struct PoolInner {
    slots: Mutex<Vec<Slot>>,
    released: Notify,
}

/// The pool of workers shared by all builds.
///
/// A worker leased to one build is invisible to scheduling until its
/// [`WorkerLease`] drops. Candidate enumeration is pinned to ascending
/// worker id, keeping the scheduler's first-seen tie-break deterministic.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(workers: Vec<Worker>) -> Self {
        let mut slots: Vec<Slot> = workers
            .into_iter()
            .map(|worker| Slot {
                worker,
                leased: false,
            })
            .collect();
        slots.sort_by(|a, b| a.worker.id.cmp(&b.worker.id));
        Self {
            inner: Arc::new(PoolInner {
                slots: Mutex::new(slots),
                released: Notify::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.lock().is_empty()
    }

    /// Snapshot of currently leasable candidates, in pinned order.
    fn candidates(&self) -> Option<NonEmpty<Candidate>> {
        let slots = self.inner.slots.lock();
        let available: Vec<Candidate> = slots
            .iter()
            .filter(|slot| !slot.leased)
            .map(|slot| Candidate {
                id: slot.worker.id.clone(),
                state: slot.worker.state,
            })
            .collect();
        NonEmpty::from_vec(available)
    }

    /// Lease a worker now, or return `None` when all are held by builds.
    pub fn try_acquire(&self) -> Option<WorkerLease> {
        let candidates = self.candidates()?;
        let chosen = select_worker(&candidates).id.clone();

        let mut slots = self.inner.slots.lock();
        let slot = slots
            .iter_mut()
            .find(|slot| slot.worker.id == chosen && !slot.leased)?;
        slot.leased = true;
        slot.worker.state = WorkerState::Building;
        debug!(worker = %chosen, "leased worker");

        Some(WorkerLease {
            pool: Arc::clone(&self.inner),
            worker: slot.worker.clone(),
        })
    }

    /// Lease a worker, waiting for a release when none is available.
    pub async fn acquire(&self) -> WorkerLease {
        loop {
            if let Some(lease) = self.try_acquire() {
                return lease;
            }
            // Register interest before re-checking so a release landing
            // in between cannot be missed.
            let released = self.inner.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            if let Some(lease) = self.try_acquire() {
                return lease;
            }
            released.await;
        }
    }

    /// Update the recorded state of an unleased worker (e.g. a latent
    /// worker coming online).
    pub fn set_state(&self, id: &WorkerId, state: WorkerState) {
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|slot| &slot.worker.id == id) {
            slot.worker.state = state;
        }
    }
}

/// Exclusive hold on one worker for the duration of a build.
///
/// Dropping the lease returns the worker to the pool as idle and wakes
/// waiters, whatever the build outcome was.
pub struct WorkerLease {
    pool: Arc<PoolInner>,
    worker: Worker,
}

impl WorkerLease {
    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    pub fn id(&self) -> &WorkerId {
        &self.worker.id
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        let mut slots = self.pool.slots.lock();
        if let Some(slot) = slots
            .iter_mut()
            .find(|slot| slot.worker.id == self.worker.id)
        {
            slot.leased = false;
            slot.worker.state = WorkerState::Idle;
        }
        drop(slots);
        debug!(worker = %self.worker.id, "released worker");
        self.pool.released.notify_waiters();
    }
}
