//! Boards written by another session.

use std::sync::Arc;

use crate::in_memory::helpers::{
    GatedStore, MemoryController, board_with, ids_in, list, store, stored_board, wait_for,
};
use mockable::{Clock, DefaultClock};
use rstest::rstest;
use taskboard::{
    board::{
        adapters::memory::InMemorySnapshotStore,
        domain::{BoardSnapshot, ListSnapshot},
        services::{SyncController, SyncEvent, SyncStatus},
    },
    config::BoardConfig,
};

fn controller_for(store: &Arc<InMemorySnapshotStore>) -> MemoryController {
    SyncController::new(
        Arc::clone(store),
        Arc::new(DefaultClock),
        BoardConfig::default(),
    )
    .expect("default config is valid")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_external_board_wins_when_idle(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    let controller = controller_for(&store);
    let mut events = controller.subscribe_events();
    controller.start().await?;
    controller.on_add_task("local")?;
    controller.flush().await?;

    let remote = board_with(&[("proceso", &["r1", "r2"])])?;
    store.publish_external(BoardSnapshot::capture(&remote, 2, DefaultClock.utc()))?;
    wait_for(&mut events, |event| {
        matches!(event, SyncEvent::ExternalChangeApplied { .. })
    })
    .await?;

    let board = controller.board();
    assert_eq!(*board, remote);
    assert!(ids_in(&board, "todo").is_empty());

    controller.on_add_task("after remote")?;
    controller.flush().await?;
    let stored = stored_board(&store)?;
    assert_eq!(ids_in(&stored, "proceso"), vec!["r1", "r2"]);
    assert_eq!(ids_in(&stored, "todo").len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreadable_external_board_is_ignored(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    let controller = controller_for(&store);
    let mut events = controller.subscribe_events();
    controller.start().await?;
    let before = controller.board();
    let mut foreign = BoardSnapshot::capture(&before, 5, DefaultClock.utc());
    foreign.lists.push(ListSnapshot {
        id: list("archive"),
        tasks: Vec::new(),
    });

    store.publish_external(foreign)?;
    wait_for(&mut events, |event| {
        matches!(event, SyncEvent::ExternalChangeRejected { .. })
    })
    .await?;

    assert_eq!(controller.board(), before);
    assert_eq!(controller.status(), SyncStatus::Ready);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn external_board_is_skipped_while_local_save_is_pending() -> eyre::Result<()> {
    let store = GatedStore::new(InMemorySnapshotStore::new());
    let controller = SyncController::new(
        Arc::new(store.clone()),
        Arc::new(DefaultClock),
        BoardConfig::default(),
    )?;
    let mut events = controller.subscribe_events();
    controller.start().await?;
    let gate = store.close_gate().await;

    let local = controller.on_add_task("local")?;
    store.wait_for_save_start().await;
    let remote = board_with(&[("delegadas", &["r"])])?;
    store
        .inner()
        .publish_external(BoardSnapshot::capture(&remote, 9, DefaultClock.utc()))?;
    let skipped = wait_for(&mut events, |event| {
        matches!(event, SyncEvent::ExternalChangeSkipped { .. })
    })
    .await?;

    assert!(matches!(
        skipped,
        SyncEvent::ExternalChangeSkipped {
            status: SyncStatus::Mutating
        }
    ));
    assert_eq!(ids_in(&controller.board(), "todo"), vec![local.to_string()]);

    drop(gate);
    controller.flush().await?;
    let stored = stored_board(store.inner())?;
    assert_eq!(ids_in(&stored, "todo"), vec![local.to_string()]);
    assert!(ids_in(&stored, "delegadas").is_empty());
    Ok(())
}
