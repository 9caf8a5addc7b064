//! MongoDB implementations of the audit storage traits

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    ClientSession, Database, IndexModel,
    bson::{self, Document, doc},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tracing::instrument;

use crate::error::{AuditError, AuditResult};
use crate::record::AuditRecord;
use crate::store::{AuditFilter, AuditIndex, AuditStore, AuditWriter};

const DUPLICATE_KEY: i32 = 11000;

/// Collection-level audit operations: bootstrap and queries.
#[derive(Clone)]
pub struct MongoAuditStore {
    db: Database,
}

impl MongoAuditStore {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Build a MongoDB filter document from an AuditFilter
    fn build_filter(filter: &AuditFilter) -> Document {
        let mut doc = doc! { "collectionName": &filter.collection_name };

        if let Some(audit_type) = filter.audit_type {
            doc.insert("type", audit_type.to_string());
        }

        if let Some(ref actor) = filter.actor {
            doc.insert("actor", actor);
        }

        if filter.from.is_some() || filter.till.is_some() {
            let mut range = doc! {};
            if let Some(from) = filter.from {
                range.insert("$gte", bson::DateTime::from_millis(from.timestamp_millis()));
            }
            if let Some(till) = filter.till {
                range.insert("$lte", bson::DateTime::from_millis(till.timestamp_millis()));
            }
            doc.insert("datetime", range);
        }

        doc
    }
}

#[async_trait]
impl AuditStore for MongoAuditStore {
    #[instrument(skip(self))]
    async fn collection_exists(&self, name: &str) -> AuditResult<bool> {
        let names = self
            .db
            .list_collection_names()
            .filter(doc! { "name": name })
            .await?;
        Ok(names.iter().any(|n| n == name))
    }

    #[instrument(skip(self))]
    async fn create_collection(&self, name: &str) -> AuditResult<()> {
        self.db.create_collection(name).await?;
        Ok(())
    }

    #[instrument(skip(self, indexes))]
    async fn ensure_indexes(&self, name: &str, indexes: &[AuditIndex]) -> AuditResult<()> {
        let models = indexes
            .iter()
            .map(|index| {
                let mut keys = Document::new();
                keys.insert(index.field, 1);

                IndexModel::builder()
                    .keys(keys)
                    .options(
                        IndexOptions::builder()
                            .name(index.name.to_string())
                            .unique(index.unique)
                            .build(),
                    )
                    .build()
            })
            .collect::<Vec<_>>();

        self.db
            .collection::<Document>(name)
            .create_indexes(models)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count(&self, audit_collection: &str, filter: &AuditFilter) -> AuditResult<u64> {
        let total = self
            .db
            .collection::<AuditRecord>(audit_collection)
            .count_documents(Self::build_filter(filter))
            .await?;
        Ok(total)
    }

    #[instrument(skip(self))]
    async fn find(
        &self,
        audit_collection: &str,
        filter: &AuditFilter,
        skip: u64,
        limit: i64,
    ) -> AuditResult<Vec<AuditRecord>> {
        let options = mongodb::options::FindOptions::builder()
            .sort(doc! { "revision": 1 })
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self
            .db
            .collection::<AuditRecord>(audit_collection)
            .find(Self::build_filter(filter))
            .with_options(options)
            .await?;
        let records: Vec<AuditRecord> = cursor.try_collect().await?;

        Ok(records)
    }
}

/// Writer bound to the session of the business write being audited.
pub struct MongoAuditWriter<'a> {
    db: &'a Database,
    session: Option<&'a mut ClientSession>,
    transactional: bool,
}

impl<'a> MongoAuditWriter<'a> {
    /// Writes through `session`, which the caller has already started a
    /// transaction on.
    pub fn transactional(db: &'a Database, session: &'a mut ClientSession) -> Self {
        Self {
            db,
            session: Some(session),
            transactional: true,
        }
    }

    /// Writes without a session. Only acceptable with `without_transaction`.
    pub fn standalone(db: &'a Database) -> Self {
        Self {
            db,
            session: None,
            transactional: false,
        }
    }
}

#[async_trait]
impl AuditWriter for MongoAuditWriter<'_> {
    fn in_transaction(&self) -> bool {
        self.transactional
    }

    async fn count_revisions(
        &mut self,
        audit_collection: &str,
        source_collection: &str,
    ) -> AuditResult<u64> {
        let collection = self.db.collection::<AuditRecord>(audit_collection);
        let filter = doc! { "collectionName": source_collection };

        let count = match self.session.as_deref_mut() {
            Some(session) => collection.count_documents(filter).session(session).await?,
            None => collection.count_documents(filter).await?,
        };
        Ok(count)
    }

    async fn insert_record(
        &mut self,
        audit_collection: &str,
        record: &AuditRecord,
    ) -> AuditResult<()> {
        let collection = self.db.collection::<AuditRecord>(audit_collection);

        let result = match self.session.as_deref_mut() {
            Some(session) => collection.insert_one(record).session(session).await,
            None => collection.insert_one(record).await,
        };

        match result {
            Ok(_) => Ok(()),
            // The server has already aborted the transaction, recounting in it is pointless
            Err(err) if is_duplicate_key(&err) && self.transactional => {
                Err(AuditError::TransientConflict(err.to_string()))
            }
            Err(err) if is_duplicate_key(&err) => Err(AuditError::DuplicateRevision {
                audit_collection: audit_collection.to_string(),
                revision: record.revision,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Write conflicts inside a transaction (code 112) are not duplicate keys.
/// They carry the `TransientTransactionError` label and become
/// [`AuditError::TransientConflict`] through the `From` conversion.
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}
