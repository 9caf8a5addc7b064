use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Identity recorded when no principal is bound to the current task.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AuditType {
    Created,
    Updated,
    Deleted,
    /// Save without a usable version field
    Unknown,
}

/// One captured change, as stored in an audit collection.
///
/// Records are append-only: built once by [`crate::builder::build_record`] and
/// inserted by the revision allocator, never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub datetime: bson::DateTime,
    pub actor: String,
    pub revision: i64,
    #[serde(rename = "type")]
    pub audit_type: AuditType,
    pub collection_name: String,
    pub source: Document,
}

impl AuditRecord {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.datetime.timestamp_millis()).unwrap_or_default()
    }
}

/// JSON view of an [`AuditRecord`] returned by the audit-history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Hex ObjectId of the audit record
    pub id: Option<String>,
    pub datetime: DateTime<Utc>,
    pub actor: String,
    pub revision: i64,
    #[serde(rename = "type")]
    pub audit_type: AuditType,
    pub collection_name: String,
    /// Snapshot of the written document (relaxed extended JSON)
    #[schema(value_type = Object)]
    pub source: serde_json::Value,
}

impl From<AuditRecord> for AuditEntry {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id.map(|id| id.to_hex()),
            datetime: record.occurred_at(),
            actor: record.actor,
            revision: record.revision,
            audit_type: record.audit_type,
            collection_name: record.collection_name,
            source: Bson::Document(record.source).into_relaxed_extjson(),
        }
    }
}
