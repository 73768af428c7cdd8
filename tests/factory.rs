// ABOUTME: Integration tests for pipeline registration and trigger dispatch.
// ABOUTME: Builds run end to end on the in-memory cloud with a scripted runner.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use fornax::build::CancelToken;
use fornax::cloud::{CloudErrorKind, MemoryCloud, Tags};
use fornax::config::FactoryConfig;
use fornax::error::Error;
use fornax::factory::Factory;
use fornax::triggers::TriggerEvent;
use fornax::types::StampSource;
use support::{FakeRunner, appliance, entry};

fn test_config(extra: &str) -> FactoryConfig {
    let yaml = format!(
        "cloud:\n  region: eu-west-2\n  zone: eu-west-2a\n{extra}"
    );
    FactoryConfig::from_yaml(&yaml).unwrap()
}

async fn wire(
    config: &FactoryConfig,
    entries: &[fornax::catalog::CatalogEntry],
    cloud: &Arc<MemoryCloud>,
    runner: &Arc<FakeRunner>,
) -> fornax::error::Result<Factory> {
    Factory::from_config(config, entries, Arc::clone(cloud) as _, Arc::clone(runner) as _).await
}

async fn test_factory(
    config: &FactoryConfig,
    entries: &[fornax::catalog::CatalogEntry],
) -> (Factory, Arc<MemoryCloud>, Arc<FakeRunner>) {
    let cloud = Arc::new(MemoryCloud::for_region("eu-west-2"));
    let runner = Arc::new(FakeRunner::new());
    let factory = wire(config, entries, &cloud, &runner)
        .await
        .unwrap()
        .with_stamps(StampSource::fixed("260830_0200"));
    (factory, cloud, runner)
}

#[tokio::test]
async fn force_event_builds_the_whole_catalog() {
    support::init_tracing();
    let config = test_config("");
    let entries = vec![entry("core"), entry("gitlab")];
    let (factory, cloud, _) = test_factory(&config, &entries).await;

    assert_eq!(factory.registrations().len(), 2);
    assert_eq!(factory.pool().len(), 2);

    let reports = factory
        .dispatch(TriggerEvent::Force { appliance: None }, &CancelToken::new())
        .await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.succeeded()));
    assert_eq!(cloud.image_count(), 2);
    assert!(cloud.live_volumes().is_empty());
}

#[tokio::test]
async fn force_event_can_target_one_appliance() {
    let config = test_config("");
    let entries = vec![entry("core"), entry("gitlab")];
    let (factory, cloud, _) = test_factory(&config, &entries).await;

    let reports = factory
        .dispatch(
            TriggerEvent::Force {
                appliance: Some(appliance("gitlab")),
            },
            &CancelToken::new(),
        )
        .await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].appliance.as_str(), "gitlab");
    assert_eq!(cloud.image_count(), 1);
}

#[tokio::test]
async fn change_event_matches_project_and_branch() {
    let config = test_config("triggers:\n  tree_stable_timer: 0s\n");
    let entries = vec![entry("core"), entry("gitlab")];
    let (factory, _, runner) = test_factory(&config, &entries).await;

    let reports = factory
        .dispatch(
            TriggerEvent::Change {
                project: "core".to_string(),
                branch: "master".to_string(),
            },
            &CancelToken::new(),
        )
        .await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].appliance.as_str(), "core");

    // A change on a foreign branch matches nothing.
    let reports = factory
        .dispatch(
            TriggerEvent::Change {
                project: "core".to_string(),
                branch: "experimental".to_string(),
            },
            &CancelToken::new(),
        )
        .await;
    assert!(reports.is_empty());

    // Only the one matched build ran a build action.
    assert_eq!(runner.count_matching("--build-only"), 1);
}

#[tokio::test]
async fn tick_event_fires_only_when_the_crontab_matches() {
    let config = test_config("triggers:\n  nightly_crontab: \"0 2 * * *\"\n");
    let entries = vec![entry("core")];
    let (factory, cloud, _) = test_factory(&config, &entries).await;

    let off_schedule = Local.with_ymd_and_hms(2026, 8, 30, 3, 0, 0).unwrap();
    let reports = factory
        .dispatch(TriggerEvent::Tick(off_schedule), &CancelToken::new())
        .await;
    assert!(reports.is_empty());

    let on_schedule = Local.with_ymd_and_hms(2026, 8, 30, 2, 0, 0).unwrap();
    let reports = factory
        .dispatch(TriggerEvent::Tick(on_schedule), &CancelToken::new())
        .await;
    assert_eq!(reports.len(), 1);
    assert_eq!(cloud.image_count(), 1);
}

#[tokio::test]
async fn tick_without_crontab_never_fires() {
    let config = test_config("");
    let entries = vec![entry("core")];
    let (factory, _, _) = test_factory(&config, &entries).await;

    let now = Local.with_ymd_and_hms(2026, 8, 30, 2, 0, 0).unwrap();
    let reports = factory
        .dispatch(TriggerEvent::Tick(now), &CancelToken::new())
        .await;
    assert!(reports.is_empty());
}

#[tokio::test]
async fn builds_share_a_bounded_worker_pool() {
    let config = test_config("workers:\n  max_instances: 1\n");
    let entries = vec![entry("core"), entry("gitlab"), entry("mysql")];
    let (factory, cloud, _) = test_factory(&config, &entries).await;

    assert_eq!(factory.pool().len(), 1);

    // All three builds complete, serialized over the single worker.
    let reports = factory
        .dispatch(TriggerEvent::Force { appliance: None }, &CancelToken::new())
        .await;
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.succeeded()));
    assert_eq!(cloud.image_count(), 3);
    assert!(cloud.live_volumes().is_empty());
}

#[tokio::test]
async fn cancelled_dispatch_skips_work_but_reports_every_build() {
    let config = test_config("");
    let entries = vec![entry("core"), entry("gitlab")];
    let (factory, cloud, _) = test_factory(&config, &entries).await;

    let cancel = CancelToken::new();
    cancel.cancel();
    let reports = factory
        .dispatch(TriggerEvent::Force { appliance: None }, &cancel)
        .await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.cancelled));
    assert_eq!(cloud.image_count(), 0);
}

#[tokio::test]
async fn invalid_crontab_is_a_configuration_error() {
    let config = test_config("triggers:\n  nightly_crontab: \"not a crontab\"\n");
    let cloud = Arc::new(MemoryCloud::for_region("eu-west-2"));
    let runner = Arc::new(FakeRunner::new());

    let err = wire(&config, &[entry("core")], &cloud, &runner).await;
    assert!(matches!(err, Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn bad_password_length_range_is_a_configuration_error() {
    let cloud = Arc::new(MemoryCloud::for_region("eu-west-2"));
    let runner = Arc::new(FakeRunner::new());

    let config = test_config("workers:\n  password_min_len: 0\n");
    let err = wire(&config, &[entry("core")], &cloud, &runner).await;
    assert!(matches!(err, Err(Error::InvalidConfig(_))));

    let config = test_config("workers:\n  password_min_len: 24\n  password_max_len: 16\n");
    let err = wire(&config, &[entry("core")], &cloud, &runner).await;
    assert!(matches!(err, Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn base_image_resolves_to_the_newest_match() {
    let config = test_config("workers:\n  base_image_pattern: \"worker-base_*\"\n");
    let cloud = Arc::new(MemoryCloud::for_region("eu-west-2"));
    let runner = Arc::new(FakeRunner::new());
    cloud.seed_image("worker-base_260101_0000", Tags::new());
    let newest = cloud.seed_image("worker-base_260801_0000", Tags::new());
    cloud.seed_image("core_260815_0000", Tags::new());

    let factory = wire(&config, &[entry("core")], &cloud, &runner).await.unwrap();
    assert_eq!(factory.base_image(), Some(&newest));

    // Without a pattern or tag filter, no resolution happens.
    let config = test_config("");
    let factory = wire(&config, &[entry("core")], &cloud, &runner).await.unwrap();
    assert!(factory.base_image().is_none());
}

#[tokio::test]
async fn missing_base_image_is_a_wiring_error() {
    let config = test_config("workers:\n  base_image_pattern: \"worker-base_*\"\n");
    let cloud = Arc::new(MemoryCloud::for_region("eu-west-2"));
    let runner = Arc::new(FakeRunner::new());

    let err = wire(&config, &[entry("core")], &cloud, &runner)
        .await
        .expect_err("no image matches the pattern");
    match err {
        Error::Cloud(cloud_err) => assert_eq!(cloud_err.kind(), CloudErrorKind::NotFound),
        other => panic!("expected a cloud error, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn change_dispatch_waits_out_the_quiet_period() {
    let config = test_config("triggers:\n  tree_stable_timer: 2m\n");
    let entries = vec![entry("core")];
    let (factory, cloud, _) = test_factory(&config, &entries).await;

    let started = tokio::time::Instant::now();
    let reports = factory
        .dispatch(
            TriggerEvent::Change {
                project: "core".to_string(),
                branch: "master".to_string(),
            },
            &CancelToken::new(),
        )
        .await;

    assert!(started.elapsed() >= Duration::from_secs(120));
    assert_eq!(reports.len(), 1);
    assert!(reports[0].succeeded());
    assert_eq!(cloud.image_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn timer_waits_a_full_period_before_the_first_tick() {
    let config = test_config("triggers:\n  nightly_crontab: \"* * * * *\"\n");
    let entries = vec![entry("core")];
    let (factory, _, runner) = test_factory(&config, &entries).await;

    let cancel = CancelToken::new();
    let timer = factory.run_timer(&cancel);
    tokio::pin!(timer);
    tokio::select! {
        _ = &mut timer => panic!("timer must not finish on its own"),
        _ = tokio::time::sleep(Duration::from_secs(59)) => {}
    }

    // 59 seconds in, no tick has fired yet.
    assert!(runner.commands().is_empty());
    cancel.cancel();
}
