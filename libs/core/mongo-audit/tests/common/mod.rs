//! In-memory audit backend for integration tests
//!
//! Enforces a unique `revision` per audit collection like the
//! `idx_unq_revision` index, and yields between count and insert so that
//! concurrent writers actually interleave.
//!
//! Transactions behave like MongoDB's snapshot isolation: a transaction sees
//! what was committed when it began plus its own writes, and an insert that
//! clashes with another transaction's uncommitted record, or with one
//! committed after the snapshot, fails with a transient write conflict.

#![allow(dead_code)]

use async_trait::async_trait;
use mongo_audit::{
    AuditConfig, AuditError, AuditEventListener, AuditFilter, AuditIndex, AuditRecord,
    AuditRegistry, AuditResult, AuditStore, AuditWriter,
};
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Stored {
    record: AuditRecord,
    commit_seq: u64,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Stored>>,
    indexes: HashMap<String, Vec<&'static str>>,
    /// Revisions written by transactions that have not committed yet
    claims: HashMap<(String, i64), u64>,
    commit_seq: u64,
    next_transaction: u64,
}

impl State {
    fn committed(&self, audit_collection: &str, revision: i64) -> Option<u64> {
        self.collections
            .get(audit_collection)
            .and_then(|records| records.iter().find(|s| s.record.revision == revision))
            .map(|s| s.commit_seq)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAudit {
    state: Arc<Mutex<State>>,
    inserts: Arc<AtomicUsize>,
    conflicts: Arc<AtomicUsize>,
}

impl InMemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a transaction whose snapshot is everything committed so far
    pub fn begin(&self) -> InMemoryTransaction {
        let mut state = self.state.lock().unwrap();
        state.next_transaction += 1;
        InMemoryTransaction {
            backend: self.clone(),
            id: state.next_transaction,
            snapshot: state.commit_seq,
            pending: Vec::new(),
        }
    }

    /// Writer without a session, every insert is visible immediately
    pub fn standalone_writer(&self) -> StandaloneWriter {
        StandaloneWriter {
            backend: self.clone(),
        }
    }

    pub fn records(&self, audit_collection: &str) -> Vec<AuditRecord> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<AuditRecord> = state
            .collections
            .get(audit_collection)
            .map(|stored| stored.iter().map(|s| s.record.clone()).collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.revision);
        records
    }

    pub fn revisions(&self, audit_collection: &str) -> Vec<i64> {
        self.records(audit_collection)
            .iter()
            .map(|r| r.revision)
            .collect()
    }

    pub fn indexes(&self, audit_collection: &str) -> Vec<&'static str> {
        let state = self.state.lock().unwrap();
        state
            .indexes
            .get(audit_collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert attempts, including rejected ones
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Inserts rejected with a transient write conflict
    pub fn write_conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn matching(&self, audit_collection: &str, filter: &AuditFilter) -> Vec<AuditRecord> {
        self.records(audit_collection)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect()
    }

    fn write_conflict(&self, audit_collection: &str, revision: i64) -> AuditError {
        self.conflicts.fetch_add(1, Ordering::SeqCst);
        AuditError::TransientConflict(format!(
            "WriteConflict on revision {} in {}",
            revision, audit_collection
        ))
    }
}

#[async_trait]
impl AuditStore for InMemoryAudit {
    async fn collection_exists(&self, name: &str) -> AuditResult<bool> {
        Ok(self.state.lock().unwrap().collections.contains_key(name))
    }

    async fn create_collection(&self, name: &str) -> AuditResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.collections.contains_key(name) {
            return Err(AuditError::Database(format!(
                "Collection already exists. NS: test.{}",
                name
            )));
        }
        state.collections.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn ensure_indexes(&self, name: &str, indexes: &[AuditIndex]) -> AuditResult<()> {
        let mut state = self.state.lock().unwrap();
        let existing = state.indexes.entry(name.to_string()).or_default();
        for index in indexes {
            if !existing.contains(&index.name) {
                existing.push(index.name);
            }
        }
        Ok(())
    }

    async fn count(&self, audit_collection: &str, filter: &AuditFilter) -> AuditResult<u64> {
        Ok(self.matching(audit_collection, filter).len() as u64)
    }

    async fn find(
        &self,
        audit_collection: &str,
        filter: &AuditFilter,
        skip: u64,
        limit: i64,
    ) -> AuditResult<Vec<AuditRecord>> {
        Ok(self
            .matching(audit_collection, filter)
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }
}

/// One transaction. Dropping it without [`InMemoryTransaction::commit`]
/// aborts it.
pub struct InMemoryTransaction {
    backend: InMemoryAudit,
    id: u64,
    snapshot: u64,
    pending: Vec<(String, AuditRecord)>,
}

impl InMemoryTransaction {
    pub fn commit(mut self) {
        let pending = std::mem::take(&mut self.pending);
        let mut state = self.backend.state.lock().unwrap();
        state.commit_seq += 1;
        let commit_seq = state.commit_seq;

        for (audit_collection, record) in pending {
            state
                .claims
                .remove(&(audit_collection.clone(), record.revision));
            state
                .collections
                .entry(audit_collection)
                .or_default()
                .push(Stored { record, commit_seq });
        }
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut state = self.backend.state.lock().unwrap();
        for (audit_collection, record) in self.pending.drain(..) {
            state.claims.remove(&(audit_collection, record.revision));
        }
    }
}

#[async_trait]
impl AuditWriter for InMemoryTransaction {
    fn in_transaction(&self) -> bool {
        true
    }

    async fn count_revisions(
        &mut self,
        audit_collection: &str,
        source_collection: &str,
    ) -> AuditResult<u64> {
        let visible = {
            let state = self.backend.state.lock().unwrap();
            state
                .collections
                .get(audit_collection)
                .map(|records| {
                    records
                        .iter()
                        .filter(|s| s.commit_seq <= self.snapshot)
                        .filter(|s| s.record.collection_name == source_collection)
                        .count()
                })
                .unwrap_or(0)
        };
        let own = self
            .pending
            .iter()
            .filter(|(audit, r)| audit == audit_collection && r.collection_name == source_collection)
            .count();

        tokio::task::yield_now().await;
        Ok((visible + own) as u64)
    }

    async fn insert_record(
        &mut self,
        audit_collection: &str,
        record: &AuditRecord,
    ) -> AuditResult<()> {
        self.backend.inserts.fetch_add(1, Ordering::SeqCst);

        let key = (audit_collection.to_string(), record.revision);
        let mut state = self.backend.state.lock().unwrap();

        let claimed_elsewhere = state.claims.get(&key).is_some_and(|owner| *owner != self.id);
        let committed = state.committed(audit_collection, record.revision);
        let own_duplicate = self
            .pending
            .iter()
            .any(|(audit, r)| audit == audit_collection && r.revision == record.revision);

        // A duplicate key inside a transaction aborts it just like a conflict
        if claimed_elsewhere || committed.is_some() || own_duplicate {
            drop(state);
            return Err(self.backend.write_conflict(audit_collection, record.revision));
        }

        state.claims.insert(key, self.id);
        let mut stored = record.clone();
        stored.id = Some(ObjectId::new());
        self.pending.push((audit_collection.to_string(), stored));
        Ok(())
    }
}

/// Session-less writer, duplicates surface as [`AuditError::DuplicateRevision`]
pub struct StandaloneWriter {
    backend: InMemoryAudit,
}

#[async_trait]
impl AuditWriter for StandaloneWriter {
    fn in_transaction(&self) -> bool {
        false
    }

    async fn count_revisions(
        &mut self,
        audit_collection: &str,
        source_collection: &str,
    ) -> AuditResult<u64> {
        let count = self
            .backend
            .records(audit_collection)
            .iter()
            .filter(|r| r.collection_name == source_collection)
            .count() as u64;

        tokio::task::yield_now().await;
        Ok(count)
    }

    async fn insert_record(
        &mut self,
        audit_collection: &str,
        record: &AuditRecord,
    ) -> AuditResult<()> {
        self.backend.inserts.fetch_add(1, Ordering::SeqCst);

        let key = (audit_collection.to_string(), record.revision);
        let mut state = self.backend.state.lock().unwrap();

        if state.claims.contains_key(&key)
            || state.committed(audit_collection, record.revision).is_some()
        {
            return Err(AuditError::DuplicateRevision {
                audit_collection: audit_collection.to_string(),
                revision: record.revision,
            });
        }

        state.commit_seq += 1;
        let commit_seq = state.commit_seq;
        let mut stored = record.clone();
        stored.id = Some(ObjectId::new());
        state
            .collections
            .entry(audit_collection.to_string())
            .or_default()
            .push(Stored {
                record: stored,
                commit_seq,
            });
        Ok(())
    }
}

/// Writer whose every insert loses the race
pub struct AlwaysContended {
    pub attempts: usize,
}

#[async_trait]
impl AuditWriter for AlwaysContended {
    fn in_transaction(&self) -> bool {
        false
    }

    async fn count_revisions(&mut self, _: &str, _: &str) -> AuditResult<u64> {
        Ok(0)
    }

    async fn insert_record(
        &mut self,
        audit_collection: &str,
        record: &AuditRecord,
    ) -> AuditResult<()> {
        self.attempts += 1;
        Err(AuditError::DuplicateRevision {
            audit_collection: audit_collection.to_string(),
            revision: record.revision,
        })
    }
}

pub fn products_registry(config: &AuditConfig) -> Arc<AuditRegistry> {
    AuditRegistry::builder()
        .register_collection("products", None, Some("version"))
        .register_collection("notes", None, None)
        .build(config)
        .unwrap()
}

pub fn products_listener() -> AuditEventListener {
    let config = AuditConfig::enabled();
    AuditEventListener::new(products_registry(&config), &config)
}

/// Listener that accepts session-less writers
pub fn standalone_listener() -> AuditEventListener {
    let config = AuditConfig::enabled().with_without_transaction(true);
    AuditEventListener::new(products_registry(&config), &config)
}
