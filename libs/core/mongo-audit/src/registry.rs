use crate::config::AuditConfig;
use crate::entity::Auditable;
use crate::error::{AuditError, AuditResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Where a source collection's changes are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditMetadata {
    pub audit_collection: String,
    pub version_field: Option<String>,
}

#[derive(Debug, Clone)]
struct Registration {
    source: String,
    audit_override: Option<String>,
    version_field: Option<String>,
}

/// Collects auditable collections before the registry is frozen.
#[derive(Debug, Default)]
pub struct AuditRegistryBuilder {
    registrations: Vec<Registration>,
}

impl AuditRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Auditable>(self) -> Self {
        self.register_collection(E::COLLECTION, E::AUDIT_COLLECTION, E::VERSION_FIELD)
    }

    pub fn register_collection(
        mut self,
        source: impl Into<String>,
        audit_collection: Option<&str>,
        version_field: Option<&str>,
    ) -> Self {
        self.registrations.push(Registration {
            source: source.into(),
            audit_override: audit_collection.map(str::to_string),
            version_field: version_field.map(str::to_string),
        });
        self
    }

    /// Resolves audit collection names and freezes the mapping.
    ///
    /// # Errors
    /// - prefix and suffix are both empty
    /// - a source collection is registered twice
    /// - two sources resolve to the same audit collection
    /// - an audit collection name equals a registered source name
    pub fn build(self, config: &AuditConfig) -> AuditResult<Arc<AuditRegistry>> {
        config.validate()?;

        let mut entries: HashMap<String, AuditMetadata> = HashMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for registration in self.registrations {
            if entries.contains_key(&registration.source) {
                return Err(AuditError::Config(format!(
                    "Source collection '{}' is registered more than once",
                    registration.source
                )));
            }

            let audit_collection = registration
                .audit_override
                .unwrap_or_else(|| config.audit_collection_name(&registration.source));

            if let Some(owner) = owners.get(&audit_collection) {
                return Err(AuditError::Config(format!(
                    "Audit collection '{}' is shared by '{}' and '{}'",
                    audit_collection, owner, registration.source
                )));
            }
            owners.insert(audit_collection.clone(), registration.source.clone());

            entries.insert(
                registration.source,
                AuditMetadata {
                    audit_collection,
                    version_field: registration.version_field,
                },
            );
        }

        if let Some(audit) = owners.keys().find(|audit| entries.contains_key(*audit)) {
            return Err(AuditError::Config(format!(
                "Audit collection '{}' collides with an audited source collection",
                audit
            )));
        }

        Ok(Arc::new(AuditRegistry { entries }))
    }
}

/// Immutable source → audit collection mapping, shared through `Arc`.
#[derive(Debug, Default)]
pub struct AuditRegistry {
    entries: HashMap<String, AuditMetadata>,
}

impl AuditRegistry {
    pub fn builder() -> AuditRegistryBuilder {
        AuditRegistryBuilder::new()
    }

    pub fn lookup(&self, source_collection: &str) -> Option<&AuditMetadata> {
        self.entries.get(source_collection)
    }

    pub fn contains(&self, source_collection: &str) -> bool {
        self.entries.contains_key(source_collection)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AuditMetadata)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
