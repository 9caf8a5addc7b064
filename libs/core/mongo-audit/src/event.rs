use chrono::{DateTime, Utc};
use mongodb::bson::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Save,
    Delete,
}

/// After-write notification emitted by a repository inside the write's session.
#[derive(Debug, Clone)]
pub struct WriteEvent {
    pub kind: WriteKind,
    pub collection_name: String,
    /// Document as persisted (or as it was before deletion)
    pub document: Document,
    pub timestamp: DateTime<Utc>,
}

impl WriteEvent {
    pub fn saved(collection_name: impl Into<String>, document: Document) -> Self {
        Self {
            kind: WriteKind::Save,
            collection_name: collection_name.into(),
            document,
            timestamp: Utc::now(),
        }
    }

    pub fn deleted(collection_name: impl Into<String>, document: Document) -> Self {
        Self {
            kind: WriteKind::Delete,
            collection_name: collection_name.into(),
            document,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
