// ABOUTME: Integration tests for image retention pruning.
// ABOUTME: Keeps exactly the newest max_versions images; deletions are independent.

mod support;

use fornax::cloud::{CloudProvider, FailureInjection, MemoryCloud, Tags, tag};
use fornax::retention::{PruneError, prune_old_images};
use proptest::prelude::*;
use support::appliance;

fn tags_for(name: &str, stamp: &str) -> Tags {
    Tags::from([
        (tag::APPLIANCE.to_string(), name.to_string()),
        (tag::TIMESTAMP.to_string(), stamp.to_string()),
    ])
}

/// Seed `count` images with strictly increasing stamps, oldest first.
fn seed_versions(cloud: &MemoryCloud, name: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|n| {
            let stamp = format!("2601{:02}_0000", n + 1);
            cloud.seed_image(&format!("{name}_{stamp}"), tags_for(name, &stamp));
            stamp
        })
        .collect()
}

async fn remaining_stamps(cloud: &MemoryCloud, name: &str) -> Vec<String> {
    let filter = Tags::from([(tag::APPLIANCE.to_string(), name.to_string())]);
    let mut stamps: Vec<String> = cloud
        .find_images(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|image| image.timestamp_tag().to_string())
        .collect();
    stamps.sort();
    stamps
}

#[tokio::test]
async fn keeps_only_the_newest_max_versions() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    let stamps = seed_versions(&cloud, "core", 6);

    let outcome = prune_old_images(&cloud, &appliance("core"), 4).await.unwrap();
    assert_eq!(outcome.examined, 6);
    assert_eq!(outcome.deleted.len(), 2);
    assert!(outcome.fully_succeeded());

    assert_eq!(remaining_stamps(&cloud, "core").await, stamps[2..].to_vec());
}

#[tokio::test]
async fn at_or_below_cap_deletes_nothing() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    seed_versions(&cloud, "core", 4);

    let outcome = prune_old_images(&cloud, &appliance("core"), 4).await.unwrap();
    assert_eq!(outcome.examined, 4);
    assert!(outcome.deleted.is_empty());
    assert_eq!(cloud.image_count(), 4);

    let outcome = prune_old_images(&cloud, &appliance("core"), 10).await.unwrap();
    assert!(outcome.deleted.is_empty());
    assert_eq!(cloud.image_count(), 4);
}

#[tokio::test]
async fn pruning_is_idempotent() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    seed_versions(&cloud, "core", 7);

    let first = prune_old_images(&cloud, &appliance("core"), 3).await.unwrap();
    assert_eq!(first.deleted.len(), 4);

    let second = prune_old_images(&cloud, &appliance("core"), 3).await.unwrap();
    assert_eq!(second.examined, 3);
    assert!(second.deleted.is_empty());
    assert_eq!(cloud.image_count(), 3);
}

#[tokio::test]
async fn other_appliances_are_untouched() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    seed_versions(&cloud, "core", 5);
    seed_versions(&cloud, "gitlab", 2);

    prune_old_images(&cloud, &appliance("core"), 2).await.unwrap();
    assert_eq!(remaining_stamps(&cloud, "core").await.len(), 2);
    assert_eq!(remaining_stamps(&cloud, "gitlab").await.len(), 2);
}

#[tokio::test]
async fn deletion_failures_are_reported_not_fatal() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    seed_versions(&cloud, "core", 5);
    cloud.set_failures(FailureInjection {
        delete_image: true,
        ..Default::default()
    });

    let outcome = prune_old_images(&cloud, &appliance("core"), 2).await.unwrap();
    assert_eq!(outcome.examined, 5);
    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.failed.len(), 3);
    assert!(!outcome.fully_succeeded());
    assert_eq!(cloud.image_count(), 5);
}

#[tokio::test]
async fn listing_failure_is_an_error() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    cloud.set_failures(FailureInjection {
        find_images: true,
        ..Default::default()
    });

    let err = prune_old_images(&cloud, &appliance("core"), 2).await;
    assert!(matches!(err, Err(PruneError::List { .. })));
}

#[tokio::test]
async fn snapshots_go_with_their_images() {
    let cloud = MemoryCloud::for_region("eu-west-2");
    seed_versions(&cloud, "core", 5);
    assert_eq!(cloud.snapshot_count(), 5);

    prune_old_images(&cloud, &appliance("core"), 1).await.unwrap();
    assert_eq!(cloud.snapshot_count(), 1);
}

proptest! {
    /// For any image count and cap, pruning keeps `min(count, cap)`
    /// images and they are exactly the newest ones.
    #[test]
    fn prune_keeps_min_of_count_and_cap(count in 0usize..20, cap in 0usize..10) {
        let cloud = MemoryCloud::for_region("eu-west-2");
        let stamps = seed_versions(&cloud, "core", count);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let outcome = runtime
            .block_on(prune_old_images(&cloud, &appliance("core"), cap))
            .unwrap();

        prop_assert_eq!(outcome.examined, count);
        prop_assert_eq!(outcome.deleted.len(), count.saturating_sub(cap));
        prop_assert!(outcome.fully_succeeded());

        let remaining = runtime.block_on(remaining_stamps(&cloud, "core"));
        let expected: Vec<String> = stamps[count.saturating_sub(cap)..].to_vec();
        prop_assert_eq!(remaining, expected);
    }
}
