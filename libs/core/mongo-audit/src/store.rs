//! Storage seams for the audit subsystem.
//!
//! [`AuditWriter`] is bound to a single business write (and its session);
//! [`AuditStore`] serves startup bootstrap and the read side.

use crate::error::AuditResult;
use crate::record::{AuditRecord, AuditType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Session-scoped access used while appending one audit record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditWriter: Send {
    /// Whether the enclosing business write runs inside a transaction
    fn in_transaction(&self) -> bool;

    /// Number of records in `audit_collection` originating from `source_collection`
    async fn count_revisions(
        &mut self,
        audit_collection: &str,
        source_collection: &str,
    ) -> AuditResult<u64>;

    /// Appends `record`. A unique-revision violation must surface as
    /// [`AuditError::DuplicateRevision`](crate::AuditError::DuplicateRevision).
    async fn insert_record(&mut self, audit_collection: &str, record: &AuditRecord)
    -> AuditResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn collection_exists(&self, name: &str) -> AuditResult<bool>;

    async fn create_collection(&self, name: &str) -> AuditResult<()>;

    /// Must be idempotent for identical index definitions.
    async fn ensure_indexes(&self, name: &str, indexes: &[AuditIndex]) -> AuditResult<()>;

    async fn count(&self, audit_collection: &str, filter: &AuditFilter) -> AuditResult<u64>;

    /// Matching records ordered by ascending revision.
    async fn find(
        &self,
        audit_collection: &str,
        filter: &AuditFilter,
        skip: u64,
        limit: i64,
    ) -> AuditResult<Vec<AuditRecord>>;
}

/// Single-field ascending index on an audit collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditIndex {
    pub name: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

impl AuditIndex {
    pub const DATETIME: AuditIndex = AuditIndex {
        name: "idx_datetime",
        field: "datetime",
        unique: false,
    };

    pub const ACTOR: AuditIndex = AuditIndex {
        name: "idx_actor",
        field: "actor",
        unique: false,
    };

    pub const UNIQUE_REVISION: AuditIndex = AuditIndex {
        name: "idx_unq_revision",
        field: "revision",
        unique: true,
    };

    pub fn defaults() -> [AuditIndex; 3] {
        [Self::DATETIME, Self::ACTOR, Self::UNIQUE_REVISION]
    }
}

/// Conjunctive filter over one source collection's audit trail.
/// Datetime bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub collection_name: String,
    pub audit_type: Option<AuditType>,
    pub actor: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub till: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn for_collection(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        let at = record.occurred_at();

        record.collection_name == self.collection_name
            && self.audit_type.is_none_or(|t| t == record.audit_type)
            && self.actor.as_deref().is_none_or(|a| a == record.actor)
            && self.from.is_none_or(|from| at >= from)
            && self.till.is_none_or(|till| at <= till)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::{self, doc};

    fn record_at(hour: u32, actor: &str) -> AuditRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        AuditRecord {
            id: None,
            datetime: bson::DateTime::from_millis(at.timestamp_millis()),
            actor: actor.to_string(),
            revision: 1,
            audit_type: AuditType::Created,
            collection_name: "products".to_string(),
            source: doc! {},
        }
    }

    #[test]
    fn test_default_indexes() {
        let indexes = AuditIndex::defaults();
        assert_eq!(indexes.iter().filter(|i| i.unique).count(), 1);
        assert_eq!(indexes[2].name, "idx_unq_revision");
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let filter = AuditFilter {
            from: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            till: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
            ..AuditFilter::for_collection("products")
        };

        assert!(filter.matches(&record_at(10, "a")));
        assert!(filter.matches(&record_at(12, "a")));
        assert!(!filter.matches(&record_at(13, "a")));
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let filter = AuditFilter {
            actor: Some("alice".into()),
            audit_type: Some(AuditType::Created),
            ..AuditFilter::for_collection("products")
        };

        assert!(filter.matches(&record_at(1, "alice")));
        assert!(!filter.matches(&record_at(1, "bob")));
        assert!(!AuditFilter::for_collection("orders").matches(&record_at(1, "alice")));
    }
}
