//! Pure construction of audit records from write notifications.

use crate::entity::INITIAL_VERSION;
use crate::event::{WriteEvent, WriteKind};
use crate::record::{AuditRecord, AuditType};
use mongodb::bson::{self, Bson, Document};

/// Classifies a saved document by its version field.
///
/// Missing field, unregistered field or a non-integer value yields
/// [`AuditType::Unknown`].
pub fn classify(document: &Document, version_field: Option<&str>) -> AuditType {
    let Some(field) = version_field else {
        return AuditType::Unknown;
    };

    let version = match document.get(field) {
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Int32(v)) => i64::from(*v),
        _ => return AuditType::Unknown,
    };

    if version == INITIAL_VERSION {
        AuditType::Created
    } else {
        AuditType::Updated
    }
}

pub fn build_record(
    event: &WriteEvent,
    revision: i64,
    actor: &str,
    version_field: Option<&str>,
) -> AuditRecord {
    let audit_type = match event.kind {
        WriteKind::Delete => AuditType::Deleted,
        WriteKind::Save => classify(&event.document, version_field),
    };

    AuditRecord {
        id: None,
        datetime: bson::DateTime::from_millis(event.timestamp.timestamp_millis()),
        actor: actor.to_string(),
        revision,
        audit_type,
        collection_name: event.collection_name.clone(),
        source: event.document.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mongodb::bson::doc;

    #[test]
    fn test_classify_by_version() {
        assert_eq!(
            classify(&doc! { "version": 0_i64 }, Some("version")),
            AuditType::Created
        );
        assert_eq!(
            classify(&doc! { "version": 4_i32 }, Some("version")),
            AuditType::Updated
        );
    }

    #[test]
    fn test_classify_unknown() {
        let document = doc! { "version": "1" };
        assert_eq!(classify(&document, Some("version")), AuditType::Unknown);
        assert_eq!(classify(&document, None), AuditType::Unknown);
        assert_eq!(classify(&doc! {}, Some("version")), AuditType::Unknown);
    }

    #[test]
    fn test_delete_ignores_version() {
        let event = WriteEvent::deleted("products", doc! { "version": 0_i64 });
        let record = build_record(&event, 7, "bob", Some("version"));

        assert_eq!(record.audit_type, AuditType::Deleted);
        assert_eq!(record.revision, 7);
        assert_eq!(record.actor, "bob");
        assert!(record.id.is_none());
    }

    #[test]
    fn test_datetime_comes_from_event() {
        let written_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = WriteEvent::saved("products", doc! { "version": 1_i64 }).at(written_at);

        let record = build_record(&event, 1, "SYSTEM", Some("version"));
        assert_eq!(record.occurred_at(), written_at);
        assert_eq!(record.source, event.document);
        assert_eq!(record.collection_name, "products");
    }
}
