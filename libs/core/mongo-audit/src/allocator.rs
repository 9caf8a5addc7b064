use crate::builder::build_record;
use crate::error::{AuditError, AuditResult};
use crate::event::WriteEvent;
use crate::record::AuditRecord;
use crate::registry::AuditMetadata;
use crate::store::AuditWriter;
use tracing::{instrument, warn};

pub const MAX_REVISION_ATTEMPTS: u32 = 3;

/// Assigns `count + 1` revisions and appends audit records.
///
/// Gaps and duplicates are prevented by the unique `revision` index alone. No
/// locks are taken.
///
/// Outside a transaction a writer that computed a taken revision loses the
/// insert and recounts here. Inside a transaction the server reports the clash
/// as a write conflict and aborts the transaction, so
/// [`AuditError::TransientConflict`] is returned as is and the caller reruns
/// the whole transaction (see [`crate::TransactionRetry`]).
#[derive(Debug, Clone)]
pub struct RevisionAllocator {
    without_transaction: bool,
    max_attempts: u32,
}

impl RevisionAllocator {
    pub fn new(without_transaction: bool) -> Self {
        Self {
            without_transaction,
            max_attempts: MAX_REVISION_ATTEMPTS,
        }
    }

    #[instrument(
        skip(self, writer, event, metadata),
        fields(
            collection = %event.collection_name,
            audit_collection = %metadata.audit_collection,
        )
    )]
    pub async fn append<W>(
        &self,
        writer: &mut W,
        event: &WriteEvent,
        metadata: &AuditMetadata,
        actor: &str,
    ) -> AuditResult<AuditRecord>
    where
        W: AuditWriter + ?Sized,
    {
        if !self.without_transaction && !writer.in_transaction() {
            return Err(AuditError::NoActiveTransaction {
                collection: event.collection_name.clone(),
            });
        }

        let version_field = metadata.version_field.as_deref();

        for attempt in 1..=self.max_attempts {
            let count = writer
                .count_revisions(&metadata.audit_collection, &event.collection_name)
                .await?;
            let revision = i64::try_from(count).unwrap_or(i64::MAX - 1) + 1;

            let record = build_record(event, revision, actor, version_field);

            match writer
                .insert_record(&metadata.audit_collection, &record)
                .await
            {
                Ok(()) => {
                    tracing::debug!(revision, attempt, "Audit record appended");
                    return Ok(record);
                }
                Err(AuditError::DuplicateRevision { revision, .. }) => {
                    warn!(
                        revision,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Revision already taken, recounting"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(AuditError::NonRecoverableRace {
            audit_collection: metadata.audit_collection.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AuditType;
    use crate::store::MockAuditWriter;
    use mockall::Sequence;
    use mongodb::bson::doc;

    fn metadata() -> AuditMetadata {
        AuditMetadata {
            audit_collection: "products_aud".to_string(),
            version_field: Some("version".to_string()),
        }
    }

    fn duplicate(revision: i64) -> AuditError {
        AuditError::DuplicateRevision {
            audit_collection: "products_aud".to_string(),
            revision,
        }
    }

    #[tokio::test]
    async fn test_first_revision() {
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(true);
        writer
            .expect_count_revisions()
            .withf(|audit, source| audit == "products_aud" && source == "products")
            .times(1)
            .returning(|_, _| Ok(0));
        writer
            .expect_insert_record()
            .withf(|audit, record| audit == "products_aud" && record.revision == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let event = WriteEvent::saved("products", doc! { "version": 0_i64 });
        let record = RevisionAllocator::new(false)
            .append(&mut writer, &event, &metadata(), "alice")
            .await
            .unwrap();

        assert_eq!(record.revision, 1);
        assert_eq!(record.audit_type, AuditType::Created);
        assert_eq!(record.actor, "alice");
    }

    #[tokio::test]
    async fn test_requires_transaction() {
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(false);
        writer.expect_count_revisions().never();
        writer.expect_insert_record().never();

        let event = WriteEvent::saved("products", doc! { "version": 0_i64 });
        let result = RevisionAllocator::new(false)
            .append(&mut writer, &event, &metadata(), "alice")
            .await;

        assert!(matches!(
            result,
            Err(AuditError::NoActiveTransaction { collection }) if collection == "products"
        ));
    }

    #[tokio::test]
    async fn test_without_transaction_skips_precondition() {
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(false);
        writer.expect_count_revisions().returning(|_, _| Ok(4));
        writer.expect_insert_record().returning(|_, _| Ok(()));

        let event = WriteEvent::deleted("products", doc! { "version": 3_i64 });
        let record = RevisionAllocator::new(true)
            .append(&mut writer, &event, &metadata(), "SYSTEM")
            .await
            .unwrap();

        assert_eq!(record.revision, 5);
        assert_eq!(record.audit_type, AuditType::Deleted);
    }

    #[tokio::test]
    async fn test_recounts_after_conflict() {
        let mut seq = Sequence::new();
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(true);
        writer
            .expect_count_revisions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(0));
        writer
            .expect_insert_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, record| Err(duplicate(record.revision)));
        writer
            .expect_count_revisions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(1));
        writer
            .expect_insert_record()
            .withf(|_, record| record.revision == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let event = WriteEvent::saved("products", doc! { "version": 1_i64 });
        let record = RevisionAllocator::new(false)
            .append(&mut writer, &event, &metadata(), "bob")
            .await
            .unwrap();

        assert_eq!(record.revision, 2);
        assert_eq!(record.audit_type, AuditType::Updated);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(true);
        writer
            .expect_count_revisions()
            .times(3)
            .returning(|_, _| Ok(0));
        writer
            .expect_insert_record()
            .times(3)
            .returning(|_, record| Err(duplicate(record.revision)));

        let event = WriteEvent::saved("products", doc! { "version": 1_i64 });
        let result = RevisionAllocator::new(false)
            .append(&mut writer, &event, &metadata(), "bob")
            .await;

        assert!(matches!(
            result,
            Err(AuditError::NonRecoverableRace { audit_collection }) if audit_collection == "products_aud"
        ));
    }

    #[tokio::test]
    async fn test_transaction_conflict_is_returned_without_recount() {
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(true);
        writer
            .expect_count_revisions()
            .times(1)
            .returning(|_, _| Ok(0));
        writer.expect_insert_record().times(1).returning(|_, _| {
            Err(AuditError::TransientConflict(
                "WriteConflict error: this operation conflicted with another operation".into(),
            ))
        });

        let event = WriteEvent::saved("products", doc! { "version": 0_i64 });
        let err = RevisionAllocator::new(false)
            .append(&mut writer, &event, &metadata(), "bob")
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_other_insert_errors_are_not_retried() {
        let mut writer = MockAuditWriter::new();
        writer.expect_in_transaction().return_const(true);
        writer
            .expect_count_revisions()
            .times(1)
            .returning(|_, _| Ok(0));
        writer
            .expect_insert_record()
            .times(1)
            .returning(|_, _| Err(AuditError::Database("WriteConflict".into())));

        let event = WriteEvent::saved("products", doc! { "version": 1_i64 });
        let result = RevisionAllocator::new(false)
            .append(&mut writer, &event, &metadata(), "bob")
            .await;

        assert!(matches!(result, Err(AuditError::Database(_))));
    }
}
