//! End-to-end flows through the trigger interface.

use std::sync::Arc;

use crate::in_memory::helpers::{
    MemoryController, ids_in, list, store, stored_board, task_id, wait_for,
};
use mockable::DefaultClock;
use rstest::rstest;
use taskboard::{
    board::{
        adapters::memory::InMemorySnapshotStore,
        domain::{ErrorKind, Mutation},
        services::{DragEnd, DragOutcome, SyncController, SyncError, SyncEvent, SyncStatus},
    },
    config::BoardConfig,
};

fn controller_for(store: &Arc<InMemorySnapshotStore>, config: BoardConfig) -> MemoryController {
    SyncController::new(Arc::clone(store), Arc::new(DefaultClock), config)
        .expect("config is valid")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn session_edits_survive_reload(store: Arc<InMemorySnapshotStore>) -> eyre::Result<()> {
    let first = controller_for(&store, BoardConfig::default());
    first.start().await?;
    let milk = first.on_add_task("buy milk")?;
    let bank = first.on_add_task("call bank")?;
    first.on_drag_end(DragEnd::new(list("todo"), 0).dropped_on(list("proceso"), None))?;
    first.on_toggle_complete(&bank)?;
    first.close().await?;

    let second = controller_for(&store, BoardConfig::default());
    let board = second.start().await?;

    assert_eq!(ids_in(&board, "todo"), vec![bank.to_string()]);
    assert_eq!(ids_in(&board, "proceso"), vec![milk.to_string()]);
    let bank_task = board.find_task(&bank).expect("task should exist").task;
    assert!(bank_task.completed());
    assert_eq!(bank_task.order(), 0);
    assert_eq!(*board, stored_board(&store)?);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_mutation_racing_start_is_saved(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    let controller = Arc::new(controller_for(&store, BoardConfig::default()));
    let mut events = controller.subscribe_events();
    let racer = {
        let controller = Arc::clone(&controller);
        tokio::task::spawn_blocking(move || loop {
            match controller.on_add_task("early") {
                Ok(id) => break Ok(id),
                Err(SyncError::NotReady(_)) => std::thread::yield_now(),
                Err(err) => break Err(err),
            }
        })
    };

    controller.start().await?;
    let early = racer.await??;
    wait_for(&mut events, |event| matches!(event, SyncEvent::SaveSucceeded { version: 1 })).await?;

    assert!(!controller.has_unsaved_changes());
    assert_eq!(controller.status(), SyncStatus::Ready);
    assert_eq!(ids_in(&stored_board(&store)?, "todo"), vec![early.to_string()]);
    controller.close().await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn revisions_keep_increasing_across_sessions(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    for session in ["monday", "tuesday"] {
        let controller = controller_for(&store, BoardConfig::default());
        controller.start().await?;
        controller.on_add_task(&format!("{session} first"))?;
        controller.on_add_task(&format!("{session} second"))?;
        controller.close().await?;
    }

    let revisions = store.saved_revisions();
    assert!(
        revisions.windows(2).all(|pair| pair.first() < pair.last()),
        "stored revisions went backwards: {revisions:?}"
    );
    assert_eq!(revisions.last(), Some(&4));
    let current = store.current().ok_or_else(|| eyre::eyre!("snapshot should exist"))?;
    assert_eq!(current.revision, 4);
    assert_eq!(stored_board(&store)?.task_count(), 4);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_change_is_announced_then_saved(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    let controller = controller_for(&store, BoardConfig::default());
    let mut events = controller.subscribe_events();
    controller.start().await?;

    controller.on_add_task("first")?;
    wait_for(&mut events, |event| matches!(event, SyncEvent::BoardChanged { version: 1 })).await?;
    wait_for(&mut events, |event| matches!(event, SyncEvent::SaveSucceeded { version: 1 })).await?;

    assert_eq!(controller.status(), SyncStatus::Ready);
    assert_eq!(controller.persisted_version(), 1);
    controller.close().await?;
    wait_for(&mut events, |event| matches!(event, SyncEvent::Closed)).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_zone_drop_is_persisted(store: Arc<InMemorySnapshotStore>) -> eyre::Result<()> {
    let config = BoardConfig::default().with_delete_zone(list("trash"));
    let controller = controller_for(&store, config);
    controller.start().await?;
    let doomed = controller.on_add_task("obsolete")?;
    let kept = controller.on_add_task("keep me")?;

    let outcome =
        controller.on_drag_end(DragEnd::new(list("todo"), 0).dropped_on(list("trash"), Some(0)))?;
    controller.flush().await?;

    assert!(matches!(outcome, DragOutcome::Deleted { task_id: ref removed, .. } if *removed == doomed));
    let stored = stored_board(&store)?;
    assert_eq!(ids_in(&stored, "todo"), vec![kept.to_string()]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn engine_errors_leave_state_and_store_untouched(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    let controller = controller_for(&store, BoardConfig::default());
    controller.start().await?;
    controller.on_add_task("only")?;
    controller.flush().await?;
    let saves = store.save_count();
    let before = controller.board();

    let errors = [
        controller
            .apply(Mutation::MoveWithinList {
                list_id: list("todo"),
                from_index: 0,
                to_index: 4,
            })
            .expect_err("index should be rejected"),
        controller
            .on_delete_task(&task_id("missing"))
            .expect_err("unknown task should be rejected"),
        controller
            .on_drag_end(DragEnd::new(list("todo"), 0).dropped_on(list("archive"), None))
            .expect_err("unknown list should be rejected"),
    ];
    controller.flush().await?;

    let kinds: Vec<ErrorKind> = errors.iter().map(|err| err.kind()).collect();
    assert_eq!(
        kinds,
        vec![ErrorKind::IndexOutOfRange, ErrorKind::NotFound, ErrorKind::UnknownList]
    );
    assert_eq!(controller.board(), before);
    assert_eq!(store.save_count(), saves);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn load_failure_is_not_masked_by_empty_board(
    store: Arc<InMemorySnapshotStore>,
) -> eyre::Result<()> {
    store.fail_loads(true);
    let controller = controller_for(&store, BoardConfig::default());

    let err = controller.start().await.expect_err("load should fail");

    assert_eq!(err.kind(), ErrorKind::LoadFailed);
    assert_eq!(controller.status(), SyncStatus::LoadFailed);
    assert!(controller.on_add_task("lost").is_err());
    assert!(store.current().is_none());
    Ok(())
}
