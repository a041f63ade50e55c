//! Save coalescing while a write is in flight.

use std::sync::Arc;

use crate::in_memory::helpers::{GatedController, GatedStore, ids_in, stored_board, wait_for};
use mockable::DefaultClock;
use taskboard::{
    board::{
        adapters::memory::InMemorySnapshotStore,
        services::{SyncController, SyncEvent, SyncStatus},
    },
    config::BoardConfig,
};

async fn started(store: &GatedStore) -> eyre::Result<GatedController> {
    let controller = SyncController::new(
        Arc::new(store.clone()),
        Arc::new(DefaultClock),
        BoardConfig::default(),
    )?;
    controller.start().await?;
    Ok(controller)
}

#[tokio::test(flavor = "multi_thread")]
async fn mutations_during_save_are_applied_and_coalesced() -> eyre::Result<()> {
    let store = GatedStore::new(InMemorySnapshotStore::new());
    let controller = started(&store).await?;
    let mut events = controller.subscribe_events();
    let gate = store.close_gate().await;

    let first = controller.on_add_task("first")?;
    store.wait_for_save_start().await;
    let second = controller.on_add_task("second")?;
    let third = controller.on_add_task("third")?;

    assert_eq!(controller.status(), SyncStatus::Mutating);
    assert_eq!(
        ids_in(&controller.board(), "todo"),
        vec![first.to_string(), second.to_string(), third.to_string()]
    );
    assert!(store.inner().current().is_none());

    drop(gate);
    wait_for(&mut events, |event| matches!(event, SyncEvent::SaveSucceeded { version: 3 })).await?;

    assert_eq!(store.inner().saved_revisions(), vec![1, 3]);
    assert_eq!(*controller.board(), stored_board(store.inner())?);
    assert_eq!(controller.status(), SyncStatus::Ready);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn close_waits_for_pending_save() -> eyre::Result<()> {
    let store = GatedStore::new(InMemorySnapshotStore::new());
    let controller = started(&store).await?;
    let gate = store.close_gate().await;

    controller.on_add_task("first")?;
    store.wait_for_save_start().await;
    controller.on_add_task("second")?;

    let release = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(gate);
    });
    controller.close().await?;
    release.await?;

    assert_eq!(store.inner().saved_revisions(), vec![1, 2]);
    assert!(!controller.has_unsaved_changes());
    assert_eq!(controller.status(), SyncStatus::Closed);
    Ok(())
}
