//! Listener and revision allocation against an in-memory store that enforces
//! the unique revision index.

mod common;

use common::{AlwaysContended, InMemoryAudit, products_listener, standalone_listener};
use futures_util::future::join_all;
use mongo_audit::*;
use ::mongodb::bson::{Document, doc};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_two_simultaneous_standalone_writers_get_consecutive_revisions() {
    let backend = InMemoryAudit::new();
    let listener = standalone_listener();

    let mut first = backend.standalone_writer();
    let mut second = backend.standalone_writer();

    let desk = doc! { "name": "Desk", "version": 0_i64 };
    let chair = doc! { "name": "Chair", "version": 0_i64 };
    let (a, b) = tokio::join!(
        listener.on_after_save(&mut first, "products", &desk),
        listener.on_after_save(&mut second, "products", &chair),
    );

    assert!(a.unwrap().record().is_some());
    assert!(b.unwrap().record().is_some());
    assert_eq!(backend.revisions("products_aud"), vec![1, 2]);
    // The loser's first insert was rejected by the unique index
    assert_eq!(backend.insert_attempts(), 3);
}

#[tokio::test]
async fn test_three_simultaneous_standalone_writers_fit_in_the_retry_budget() {
    let backend = InMemoryAudit::new();
    let listener = standalone_listener();

    let mut w1 = backend.standalone_writer();
    let mut w2 = backend.standalone_writer();
    let mut w3 = backend.standalone_writer();
    let document = doc! { "version": 1_i64 };

    let (r1, r2, r3) = tokio::join!(
        listener.on_after_save(&mut w1, "products", &document),
        listener.on_after_save(&mut w2, "products", &document),
        listener.on_after_save(&mut w3, "products", &document),
    );

    for outcome in [r1, r2, r3] {
        assert_eq!(outcome.unwrap().record().unwrap().audit_type, AuditType::Updated);
    }
    assert_eq!(backend.revisions("products_aud"), vec![1, 2, 3]);
}

/// One audited save in its own transaction, committed on success
async fn save_in_transaction(
    backend: &InMemoryAudit,
    listener: &AuditEventListener,
    document: &Document,
) -> AuditResult<()> {
    let mut tx = backend.begin();
    listener.on_after_save(&mut tx, "products", document).await?;
    tx.commit();
    Ok(())
}

#[tokio::test]
async fn test_conflicting_transaction_fails_with_transient_error() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let document = doc! { "version": 0_i64 };

    let mut first = backend.begin();
    let mut second = backend.begin();
    listener
        .on_after_save(&mut first, "products", &document)
        .await
        .unwrap();

    // Both snapshots are empty, so both pick revision 1
    let err = listener
        .on_after_save(&mut second, "products", &document)
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(backend.insert_attempts(), 2);

    first.commit();
    drop(second);
    assert_eq!(backend.revisions("products_aud"), vec![1]);

    // A fresh transaction sees the committed record
    save_in_transaction(&backend, &listener, &document)
        .await
        .unwrap();
    assert_eq!(backend.revisions("products_aud"), vec![1, 2]);
}

#[tokio::test]
async fn test_aborted_transaction_releases_its_revision() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let document = doc! { "version": 0_i64 };

    {
        let mut tx = backend.begin();
        listener
            .on_after_save(&mut tx, "products", &document)
            .await
            .unwrap();
    }

    save_in_transaction(&backend, &listener, &document)
        .await
        .unwrap();
    assert_eq!(backend.revisions("products_aud"), vec![1]);
}

#[tokio::test]
async fn test_rerun_transactions_interleaved_on_one_thread() {
    const WRITERS: i64 = 20;

    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let retry = TransactionRetry::immediate(WRITERS as u32 + 1);

    let documents: Vec<Document> = (0..WRITERS)
        .map(|i| doc! { "n": i, "version": 0_i64 })
        .collect();
    let results = join_all(
        documents
            .iter()
            .map(|document| retry.run(|| save_in_transaction(&backend, &listener, document))),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(
        backend.revisions("products_aud"),
        (1..=WRITERS).collect::<Vec<_>>()
    );
    // Every writer counted before anyone inserted, so all but one lost round one
    assert!(backend.write_conflicts() >= (WRITERS - 1) as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transactions_produce_gap_free_revisions() {
    const WRITERS: i64 = 20;

    let backend = InMemoryAudit::new();
    let listener = Arc::new(products_listener());
    let retry = TransactionRetry::new(100, Duration::from_millis(1), Duration::from_millis(10));

    let handles = (0..WRITERS)
        .map(|i| {
            let backend = backend.clone();
            let listener = listener.clone();
            let retry = retry.clone();
            tokio::spawn(async move {
                let document = doc! { "n": i, "version": 0_i64 };
                retry
                    .run(|| save_in_transaction(&backend, &listener, &document))
                    .await
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        backend.revisions("products_aud"),
        (1..=WRITERS).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_delete_is_recorded_as_deleted() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();

    let mut tx = backend.begin();
    listener
        .on_after_save(&mut tx, "products", &doc! { "version": 0_i64 })
        .await
        .unwrap();
    listener
        .on_after_delete(&mut tx, "products", &doc! { "version": 0_i64 })
        .await
        .unwrap();
    tx.commit();

    let records = backend.records("products_aud");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].audit_type, AuditType::Created);
    assert_eq!(records[1].audit_type, AuditType::Deleted);
    assert_eq!(records[1].revision, 2);
}

#[tokio::test]
async fn test_save_classification() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let mut tx = backend.begin();

    for version in [0_i64, 1, 2] {
        listener
            .on_after_save(&mut tx, "products", &doc! { "version": version })
            .await
            .unwrap();
    }
    listener
        .on_after_save(&mut tx, "notes", &doc! { "version": 0_i64 })
        .await
        .unwrap();
    tx.commit();

    let types: Vec<_> = backend
        .records("products_aud")
        .into_iter()
        .map(|r| r.audit_type)
        .collect();
    assert_eq!(
        types,
        vec![AuditType::Created, AuditType::Updated, AuditType::Updated]
    );

    // No version field registered for notes
    let notes = backend.records("notes_aud");
    assert_eq!(notes[0].audit_type, AuditType::Unknown);
    assert_eq!(notes[0].revision, 1);
}

#[tokio::test]
async fn test_write_outside_transaction_is_rejected() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let mut writer = backend.standalone_writer();

    let result = listener
        .on_after_save(&mut writer, "products", &doc! { "version": 0_i64 })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, AuditError::NoActiveTransaction { .. }));
    assert!(err.to_string().contains("Try updating collection: 'products'"));
    assert!(backend.records("products_aud").is_empty());
    assert_eq!(backend.insert_attempts(), 0);
}

#[tokio::test]
async fn test_without_transaction_allows_standalone_writes() {
    let listener = standalone_listener();
    let backend = InMemoryAudit::new();
    let mut writer = backend.standalone_writer();

    listener
        .on_after_save(&mut writer, "products", &doc! { "version": 0_i64 })
        .await
        .unwrap();

    assert_eq!(backend.revisions("products_aud"), vec![1]);
}

#[tokio::test]
async fn test_unregistered_collection_leaves_no_trace() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let mut writer = backend.standalone_writer();

    let outcome = listener
        .on_after_save(&mut writer, "sessions", &doc! { "token": "abc" })
        .await
        .unwrap();

    assert_eq!(outcome, AuditOutcome::Skipped);
    assert_eq!(backend.insert_attempts(), 0);
}

#[tokio::test]
async fn test_exhausted_contention_is_fatal() {
    let listener = standalone_listener();
    let mut writer = AlwaysContended { attempts: 0 };

    let err = listener
        .on_after_save(&mut writer, "products", &doc! { "version": 1_i64 })
        .await
        .unwrap_err();

    assert_eq!(writer.attempts, MAX_REVISION_ATTEMPTS as usize);
    assert_eq!(
        err.to_string(),
        "Non recoverable Race condition in MongoDB Auditing, while getting next revision number for collection: 'products_aud'"
    );
}

#[tokio::test]
async fn test_actor_is_taken_from_scope() {
    let backend = InMemoryAudit::new();
    let listener = products_listener();
    let mut tx = backend.begin();

    scope_actor(
        "dana@example.com",
        listener.on_after_save(&mut tx, "products", &doc! { "version": 0_i64 }),
    )
    .await
    .unwrap();
    listener
        .on_after_save(&mut tx, "products", &doc! { "version": 1_i64 })
        .await
        .unwrap();
    tx.commit();

    let actors: Vec<_> = backend
        .records("products_aud")
        .into_iter()
        .map(|r| r.actor)
        .collect();
    assert_eq!(actors, vec!["dana@example.com", SYSTEM_ACTOR]);
}
