// ABOUTME: Pipeline registration and build dispatch over the worker pool.
// ABOUTME: The boundary the hosting automation framework drives with trigger events.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::build::{
    BuildReport, CancelToken, CloudStepParams, PropertyBag, StepContext, StepSpec, key, run_build,
};
use crate::catalog::CatalogEntry;
use crate::cloud::{CloudError, CloudProvider, get_image_id};
use crate::config::FactoryConfig;
use crate::error::{Error, Result};
use crate::pipeline::build_pipeline;
use crate::triggers::{ChangeFilter, Crontab, TriggerEvent};
use crate::types::{ImageId, InstanceId, StampSource};
use crate::worker::{
    CommandRunner, SshConfig, SshRunner, Worker, WorkerPool, provision_workers,
};

/// One registered pipeline: an appliance plus its triggers.
#[derive(Debug, Clone)]
pub struct Registration {
    pub entry: CatalogEntry,
    pub steps: Vec<StepSpec>,
    pub filter: ChangeFilter,
    pub nightly: Option<Crontab>,
}

/// The factory: registered pipelines, the worker pool, and the cloud
/// provider, wired from one configuration.
pub struct Factory {
    registrations: Vec<Registration>,
    pool: WorkerPool,
    provider: Arc<dyn CloudProvider>,
    runner: Arc<dyn CommandRunner>,
    params: CloudStepParams,
    action_timeout: Duration,
    stamps: StampSource,
    base_image: Option<ImageId>,
    ssh_user: String,
    quiet_period: Duration,
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("registrations", &self.registrations)
            .field("params", &self.params)
            .field("action_timeout", &self.action_timeout)
            .field("stamps", &self.stamps)
            .field("base_image", &self.base_image)
            .field("ssh_user", &self.ssh_user)
            .field("quiet_period", &self.quiet_period)
            .finish_non_exhaustive()
    }
}

impl Factory {
    /// Wire a factory from configuration and a catalog.
    ///
    /// One pipeline (with change filter and optional nightly trigger) is
    /// registered per catalog entry, and `min(entries, max_instances)`
    /// workers are provisioned. When a base-image pattern or tag filter
    /// is configured the worker base image is resolved up front; a
    /// missing base image is a wiring error.
    pub async fn from_config(
        config: &FactoryConfig,
        catalog: &[CatalogEntry],
        provider: Arc<dyn CloudProvider>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let nightly = config
            .triggers
            .nightly_crontab
            .as_deref()
            .map(Crontab::parse)
            .transpose()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let (pw_min, pw_max) = (
            config.workers.password_min_len,
            config.workers.password_max_len,
        );
        if pw_min == 0 || pw_min > pw_max {
            return Err(Error::InvalidConfig(format!(
                "invalid password length range {pw_min}..={pw_max}"
            )));
        }

        let base_image = if config.workers.base_image_pattern.is_empty()
            && config.workers.base_image_tags.is_empty()
        {
            None
        } else {
            let image = get_image_id(
                provider.as_ref(),
                &config.workers.base_image_pattern,
                &config.workers.base_image_tags,
            )
            .await
            .map_err(CloudError::from)?;
            info!(image = %image, "resolved worker base image");
            Some(image)
        };

        let registrations = catalog
            .iter()
            .map(|entry| Registration {
                entry: entry.clone(),
                steps: build_pipeline(entry, &config.build),
                filter: ChangeFilter {
                    project: entry.appliance.clone(),
                    branch: entry.branch.clone(),
                },
                nightly: nightly.clone(),
            })
            .collect();

        let workers = provision_workers(catalog.len(), config.workers.max_instances, (pw_min, pw_max))
            .into_iter()
            // Until a substantiation flow exists the backing instance id is
            // derived from the worker name.
            .map(|worker| {
                let instance = format!("i-{}", worker.id);
                worker.with_instance(instance)
            })
            .collect();

        Ok(Self {
            registrations,
            pool: WorkerPool::new(workers),
            provider,
            runner,
            params: CloudStepParams {
                zone: config.cloud.zone.clone(),
                volume_gib: config.build.volume_gib,
                object_tags: config.build.object_tags.clone(),
                image_arch: config.build.image_arch.clone(),
            },
            action_timeout: config.build.action_timeout,
            stamps: StampSource::Wallclock,
            base_image,
            ssh_user: config.workers.ssh_user.clone(),
            quiet_period: config.triggers.tree_stable_timer,
        })
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Base image workers are launched from, when one is configured.
    pub fn base_image(&self) -> Option<&ImageId> {
        self.base_image.as_ref()
    }

    /// Pin the stamp source, for tests.
    pub fn with_stamps(mut self, stamps: StampSource) -> Self {
        self.stamps = stamps;
        self
    }

    fn matching(&self, event: &TriggerEvent) -> Vec<&Registration> {
        match event {
            TriggerEvent::Change { project, branch } => self
                .registrations
                .iter()
                .filter(|reg| reg.filter.accepts(project, branch))
                .collect(),
            TriggerEvent::Force { appliance } => self
                .registrations
                .iter()
                .filter(|reg| {
                    appliance
                        .as_ref()
                        .is_none_or(|name| &reg.entry.appliance == name)
                })
                .collect(),
            TriggerEvent::Tick(at) => self
                .registrations
                .iter()
                .filter(|reg| reg.nightly.as_ref().is_some_and(|cron| cron.matches(at)))
                .collect(),
        }
    }

    /// Dispatch one trigger event: run a build for every matching
    /// pipeline, each on its own leased worker, concurrently.
    ///
    /// Returns the reports once all dispatched builds (including their
    /// cleanup steps) have finished.
    pub async fn dispatch(&self, event: TriggerEvent, cancel: &CancelToken) -> Vec<BuildReport> {
        let matching: Vec<Registration> = self.matching(&event).into_iter().cloned().collect();
        if matching.is_empty() {
            warn!(?event, "no pipeline matches trigger event");
            return Vec::new();
        }
        if self.pool.is_empty() {
            warn!("no workers registered, dropping trigger event");
            return Vec::new();
        }

        // Change events wait out the tree-stable quiet period, so a burst
        // of commits yields one build of the settled tree rather than one
        // per push. Cancellation during the wait is picked up by the
        // builds themselves at their first step boundary.
        if matches!(event, TriggerEvent::Change { .. }) && !self.quiet_period.is_zero() {
            tokio::time::sleep(self.quiet_period).await;
        }

        info!(builds = matching.len(), "dispatching builds");

        let builds = matching.into_iter().map(|reg| {
            let cancel = cancel.clone();
            async move {
                let lease = self.pool.acquire().await;
                info!(
                    appliance = %reg.entry.appliance,
                    worker = %lease.id(),
                    "starting build"
                );

                let instance: Option<InstanceId> = lease.worker().instance.clone();
                // Workers with a known address get their own SSH runner;
                // the rest share the factory-wide one.
                let runner = match worker_ssh_config(lease.worker(), &self.ssh_user) {
                    Some(ssh) => Arc::new(SshRunner::new(ssh)) as Arc<dyn CommandRunner>,
                    None => Arc::clone(&self.runner),
                };
                let mut ctx = StepContext::new(
                    Arc::clone(&self.provider),
                    runner,
                    self.params.clone(),
                )
                .with_stamps(self.stamps.clone())
                .with_action_timeout(self.action_timeout);
                if let Some(instance) = instance {
                    ctx = ctx.with_instance(instance);
                }

                let mut bag = PropertyBag::new();
                bag.set(key::APPLIANCE, reg.entry.appliance.as_str());
                bag.set(key::REPOURL, reg.entry.repository.as_str());
                bag.set(key::BRANCH, reg.entry.branch.as_str());

                let report = run_build(
                    &reg.entry.appliance,
                    &reg.entry.branch,
                    &reg.steps,
                    &ctx,
                    &mut bag,
                    &cancel,
                )
                .await;

                // Lease drops here: the worker returns to the pool only
                // after every always-run cleanup step has executed.
                drop(lease);
                report
            }
        });

        join_all(builds).await
    }

    /// Drive nightly triggers: emit one tick per minute until cancelled.
    pub async fn run_timer(&self, cancel: &CancelToken) {
        let period = Duration::from_secs(60);
        // First tick lands one full period out; an immediate tick would
        // re-fire a matching crontab minute on every daemon restart.
        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if cancel.is_cancelled() {
                return;
            }
            let now = chrono::Local::now();
            let reports = self.dispatch(TriggerEvent::Tick(now), cancel).await;
            for report in &reports {
                info!(
                    appliance = %report.appliance,
                    success = report.succeeded(),
                    "nightly build finished"
                );
            }
        }
    }
}

/// SSH settings for reaching a worker, when it has an address.
///
/// Locally-run workers (no address) fall back to the factory's shared
/// runner instead.
fn worker_ssh_config(worker: &Worker, ssh_user: &str) -> Option<SshConfig> {
    let address = worker.address.as_deref()?;
    let config = SshConfig::new(address, ssh_user).password(worker.password.clone());
    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerState;

    #[test]
    fn ssh_config_uses_worker_address_and_password() {
        let worker = Worker::new("worker_000", WorkerState::Latent)
            .with_address("10.0.0.7")
            .with_password("s3cret");
        let config = worker_ssh_config(&worker, "admin").unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.user, "admin");
        assert_eq!(config.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn addressless_worker_gets_no_ssh_config() {
        let worker = Worker::new("worker_000", WorkerState::Latent);
        assert!(worker_ssh_config(&worker, "root").is_none());
    }
}
