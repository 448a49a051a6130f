//! Behavioral guarantees of the sync core

mod common;

use common::{AUDIT, GUESTS, Harness, SlowStore, WAIT};
use guest_sync::audit::AuditService;
use guest_sync::projector::project;
use guest_sync::remote::decode_guest;
use guest_sync::sync::MAX_RETRIES;
use guest_sync::{
    ActionQueue, GuestNotice, MemoryRemoteStore, MemoryStorage, RemoteSynchronizer, SyncError,
    SyncOrchestrator,
};
use shared::error::ErrorCode;
use shared::models::{ActionPayload, Guest, GuestCreate, GuestUpdate, PendingAction};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_merge_with_empty_queue_is_identity() {
    let snapshot: Vec<Guest> = ["Alice Martin", "Bruno Petit"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            Guest::from_create(
                format!("g-{i}"),
                &GuestCreate::new(*name, "Table 1", 0),
                100,
                None,
            )
        })
        .collect();

    assert_eq!(project(&snapshot, &[]), snapshot);

    let pending = vec![PendingAction {
        id: "a-1".to_string(),
        payload: ActionPayload::MarkPresent {
            guest_id: "g-0".to_string(),
        },
        timestamp: 200,
        retry_count: 0,
    }];
    let once = project(&snapshot, &pending);
    assert_eq!(project(&snapshot, &pending), once);
}

#[tokio::test]
async fn test_double_mark_present_offline() {
    let h = Harness::start(true).await;
    let id = h
        .service
        .add_guest(GuestCreate::new("Jean Dupont", "Table 1", 1))
        .await
        .unwrap();
    h.wait_view(|v| v.guests.len() == 1).await;

    h.go_offline();
    h.service.mark_present(&id).await.unwrap();
    h.service.mark_present(&id).await.unwrap();
    assert_eq!(h.service.pending_actions().len(), 2);
    let view = h.service.view();
    assert!(view.guests[0].is_present);
    assert_eq!(view.stats.present, 1);

    let mut reports = h.service.subscribe_sync_reports();
    h.go_online();
    let report = tokio::time::timeout(WAIT, reports.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(report.success);
    assert_eq!(report.synced, 2);
    assert!(report.error.is_none());

    let docs = h.store.documents(GUESTS);
    assert_eq!(docs.len(), 1);
    assert!(decode_guest(&docs[0]).unwrap().is_present);
    let view = h
        .wait_view(|v| v.pending_count == 0 && v.guests.len() == 1 && v.guests[0].is_present)
        .await;
    assert_eq!(view.stats.present, 1);
    assert!(view.error.is_none());

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_delete_nonexistent_resolves() {
    let h = Harness::start(true).await;
    h.service.delete_guest("no-such-guest").await.unwrap();
    assert!(h.service.pending_actions().is_empty());
    h.service.shutdown().await;
}

#[tokio::test]
async fn test_validation_gate() {
    for online in [true, false] {
        let h = Harness::start(online).await;

        let invalid_creates = [
            GuestCreate::new("J", "Table 1", 0),
            GuestCreate::new("   ", "Table 1", 0),
            GuestCreate::new("Jean Dupont", "", 0),
            GuestCreate::new("Jean Dupont", "Table 1", 11),
            GuestCreate::new("x".repeat(101), "Table 1", 0),
        ];
        for data in invalid_creates {
            let err = h.service.add_guest(data).await.unwrap_err();
            assert!(err.is_validation());
        }

        let err = h
            .service
            .update_guest("g-1", GuestUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let err = h.service.mark_present("bad/id").await.unwrap_err();
        assert!(err.is_validation());
        let err = h.service.delete_guest("").await.unwrap_err();
        assert!(err.is_validation());

        assert_eq!(h.store.write_count(GUESTS), 0);
        assert!(h.service.pending_actions().is_empty());
        h.service.shutdown().await;
    }
}

#[tokio::test]
async fn test_import_is_atomic() {
    let h = Harness::start(true).await;
    let mut notices = h.service.subscribe_notices();

    let err = h
        .service
        .import_guests(vec![
            GuestCreate::new("Alice Martin", "Table 1", 1),
            GuestCreate::new("B", "Table 1", 0),
        ])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Validation { code: ErrorCode::ImportRejected, ref message } if message.contains("record 1")
    ));
    assert_eq!(h.store.write_count(GUESTS), 0);
    assert!(h.service.pending_actions().is_empty());
    assert!(notices.try_recv().is_err());

    let ids = h
        .service
        .import_guests(vec![
            GuestCreate::new("Alice Martin", "Table 1", 1),
            GuestCreate::new("Bruno Petit", "Table 1", 0),
        ])
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(h.store.write_count(GUESTS), 1);
    assert_eq!(
        notices.recv().await.unwrap(),
        GuestNotice::Imported { count: 2 }
    );

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_stats_correctness() {
    let h = Harness::start(true).await;
    let companions = [1, 0, 2, 1, 0];
    let names = [
        "Alice Martin",
        "Bruno Petit",
        "Chloe Morel",
        "David Roux",
        "Emma Blanc",
    ];

    let mut ids = Vec::new();
    for (name, companions) in names.iter().zip(companions) {
        ids.push(
            h.service
                .add_guest(GuestCreate::new(*name, "Table 1", companions))
                .await
                .unwrap(),
        );
    }
    for i in [0, 1, 3] {
        h.service.mark_present(&ids[i]).await.unwrap();
    }

    let view = h
        .wait_view(|v| v.guests.len() == 5 && v.stats.present == 3)
        .await;
    assert_eq!(view.stats.total, 5);
    assert_eq!(view.stats.absent, 2);
    assert_eq!(view.stats.total_companions, 4);
    assert_eq!(view.stats.present_companions, 2);

    let remote = h.service.refresh_stats().await.unwrap();
    assert_eq!(remote, view.stats);

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_max_retry_eviction() {
    let store = Arc::new(MemoryRemoteStore::new());
    let (audit, _rx) = AuditService::new(16);
    let remote = Arc::new(RemoteSynchronizer::new(store.clone(), audit, GUESTS));
    let queue = Arc::new(ActionQueue::new(Arc::new(MemoryStorage::new())));
    let orchestrator = SyncOrchestrator::new(queue.clone(), remote);

    // Target never exists remotely, so every replay fails
    queue
        .enqueue(ActionPayload::MarkPresent {
            guest_id: "ghost".to_string(),
        })
        .await
        .unwrap();

    for attempt in 1..=MAX_RETRIES {
        let report = orchestrator.drain().await.unwrap();
        assert!(!report.success);
        if attempt < MAX_RETRIES {
            assert_eq!(queue.list()[0].retry_count, attempt);
        } else {
            assert_eq!(report.dropped, 1);
            assert!(report.error.is_some());
        }
    }
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_concurrent_drain_is_rejected() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(200)));
    let (audit, _rx) = AuditService::new(16);
    let remote = Arc::new(RemoteSynchronizer::new(store, audit, GUESTS));
    let queue = Arc::new(ActionQueue::new(Arc::new(MemoryStorage::new())));
    let orchestrator = Arc::new(SyncOrchestrator::new(queue.clone(), remote));

    queue
        .enqueue(ActionPayload::AddGuest {
            guest: GuestCreate::new("Jean Dupont", "Table 1", 0),
        })
        .await
        .unwrap();

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.drain().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = orchestrator.drain().await.unwrap_err();
    assert!(matches!(err, SyncError::DrainInProgress));

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.synced, 1);
    assert!(!orchestrator.is_draining());
}

#[tokio::test]
async fn test_audit_entries_are_written() {
    let h = Harness::start(true).await;
    let id = h
        .service
        .add_guest(GuestCreate::new("Jean Dupont", "Table 1", 0))
        .await
        .unwrap();
    h.service.mark_present(&id).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while h.store.documents(AUDIT).len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    h.service.shutdown().await;
}
