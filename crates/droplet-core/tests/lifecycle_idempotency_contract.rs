//! Contract Test: Lifecycle Idempotency
//!
//! Constraints verified:
//! - `ensure_running()` never creates when a droplet with the name exists
//! - `ensure_stopped()` never deletes when no droplet with the name exists
//! - A failed lookup never leads to a create or delete
//! - Concurrent starts on one controller create at most one droplet
//!
//! If this test fails, repeated start/stop requests can duplicate or destroy droplets.

mod common;

use common::*;
use droplet_core::{DropletController, DropletState, Error, Transition};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn ensure_running_with_existing_droplet_never_creates() {
    let (api, dyn_api) = shared(MockCloudApi::new(vec![droplet(
        42,
        "ai-instance",
        "active",
        Some("203.0.113.10"),
    )]));
    let controller = DropletController::new(dyn_api, droplet_config());

    let transition = controller.ensure_running().await.expect("start succeeds");

    assert_eq!(
        transition,
        Transition::AlreadyRunning {
            id: 42,
            status: "active".to_string()
        }
    );
    assert_eq!(api.create_calls(), 0, "existing droplet must not be created again");
}

#[tokio::test]
async fn ensure_running_without_droplet_creates_once_with_configured_spec() {
    let (api, dyn_api) = shared(MockCloudApi::new(vec![droplet(
        7,
        "unrelated-box",
        "active",
        None,
    )]));
    let controller = DropletController::new(dyn_api, droplet_config());

    let transition = controller.ensure_running().await.expect("start succeeds");
    assert_eq!(transition, Transition::CreateAccepted);
    assert_eq!(api.create_calls(), 1);

    let spec = &api.created_specs()[0];
    assert_eq!(spec.name, "ai-instance");
    assert_eq!(spec.region, "tor1");
    assert_eq!(spec.size, "gpu-6000adax1-48gb");
    assert_eq!(spec.image, "192399134");
    assert_eq!(spec.tags, vec!["gpu".to_string()]);
    assert!(!spec.backups);
    assert!(!spec.ipv6);
    assert!(spec.monitoring);

    // Second start sees the droplet that is now provisioning
    let again = controller.ensure_running().await.expect("start succeeds");
    assert!(matches!(again, Transition::AlreadyRunning { ref status, .. } if status == "new"));
    assert_eq!(api.create_calls(), 1, "repeated start must not create a duplicate");
}

#[tokio::test]
async fn ensure_stopped_without_droplet_never_deletes() {
    let (api, dyn_api) = shared(MockCloudApi::empty());
    let controller = DropletController::new(dyn_api, droplet_config());

    let transition = controller.ensure_stopped().await.expect("stop succeeds");

    assert_eq!(transition, Transition::AlreadyStopped);
    assert_eq!(api.delete_calls(), 0);
}

#[tokio::test]
async fn ensure_stopped_deletes_by_resolved_id_once() {
    let (api, dyn_api) = shared(MockCloudApi::new(vec![
        droplet(5, "other", "active", None),
        droplet(42, "ai-instance", "active", Some("203.0.113.10")),
    ]));
    let controller = DropletController::new(dyn_api, droplet_config());

    let transition = controller.ensure_stopped().await.expect("stop succeeds");
    assert_eq!(transition, Transition::DeleteAccepted { id: 42 });
    assert_eq!(api.deleted_ids(), vec![42]);

    let again = controller.ensure_stopped().await.expect("stop succeeds");
    assert_eq!(again, Transition::AlreadyStopped);
    assert_eq!(api.delete_calls(), 1, "repeated stop must not delete again");
}

#[tokio::test]
async fn failed_lookup_never_creates_or_deletes() {
    let (api, dyn_api) = shared(MockCloudApi::empty());
    api.fail_list(true);
    let controller = DropletController::new(dyn_api, droplet_config());

    let start = controller.ensure_running().await;
    assert!(matches!(start, Err(Error::Transport(_))));

    let stop = controller.ensure_stopped().await;
    assert!(matches!(stop, Err(Error::Transport(_))));

    let status = controller.current_status().await;
    assert!(status.is_err(), "lookup failure must not be reported as Off");

    assert_eq!(api.create_calls(), 0);
    assert_eq!(api.delete_calls(), 0);
}

#[tokio::test]
async fn rejected_create_is_reported_as_failure() {
    let (api, dyn_api) = shared(MockCloudApi::empty());
    api.fail_mutations(true);
    let controller = DropletController::new(dyn_api, droplet_config());

    let err = controller.ensure_running().await.unwrap_err();

    assert!(matches!(err, Error::UnexpectedStatus { status: 422, .. }));
    assert_eq!(api.create_calls(), 1);
}

#[tokio::test]
async fn concurrent_starts_on_one_controller_create_at_most_once() {
    let (api, dyn_api) =
        shared(MockCloudApi::empty().with_list_delay(Duration::from_millis(20)));
    let controller = Arc::new(DropletController::new(dyn_api, droplet_config()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.ensure_running().await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().expect("start succeeds") == Transition::CreateAccepted {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(api.create_calls(), 1);
}

#[tokio::test]
async fn end_to_end_active_droplet_reports_status_and_skips_create() {
    let (api, dyn_api) = shared(MockCloudApi::new(vec![droplet(
        42,
        "ai-instance",
        "active",
        Some("203.0.113.10"),
    )]));
    let controller = DropletController::new(dyn_api, droplet_config());

    let status = controller.current_status().await.expect("lookup succeeds");
    assert_eq!(status, DropletState::Reported("active".to_string()));
    assert_eq!(status.as_str(), "active");

    controller.ensure_running().await.expect("start succeeds");
    assert_eq!(api.create_calls(), 0);
}

#[tokio::test]
async fn absent_droplet_reports_off() {
    let (_api, dyn_api) = shared(MockCloudApi::empty());
    let controller = DropletController::new(dyn_api, droplet_config());

    let status = controller.current_status().await.expect("lookup succeeds");
    assert_eq!(status, DropletState::Off);
}

#[tokio::test]
async fn name_match_is_exact() {
    let (api, dyn_api) = shared(MockCloudApi::new(vec![
        droplet(1, "ai-instance-old", "active", None),
        droplet(2, "AI-INSTANCE", "active", None),
    ]));
    let controller = DropletController::new(dyn_api, droplet_config());

    assert_eq!(controller.current_status().await.unwrap(), DropletState::Off);
    controller.ensure_stopped().await.unwrap();
    assert_eq!(api.delete_calls(), 0);
}
