use core_config::{ConfigError, FromEnv, env_bool_or_default, env_or_default};

pub const DEFAULT_AUDIT_SUFFIX: &str = "_aud";

/// Auditing switches, read from `MONGODB_AUDIT_*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditConfig {
    pub enabled: bool,
    /// Allow audit appends outside a transaction (standalone servers, tests)
    pub without_transaction: bool,
    pub prefix: String,
    pub suffix: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            without_transaction: false,
            prefix: String::new(),
            suffix: DEFAULT_AUDIT_SUFFIX.to_string(),
        }
    }
}

impl AuditConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_without_transaction(mut self, without_transaction: bool) -> Self {
        self.without_transaction = without_transaction;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// At least one of prefix or suffix must be set, otherwise an audit
    /// collection would share its source collection's name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.trim().is_empty() && self.suffix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "At-least one of 'mongodb.auditing.prefix' or 'mongodb.auditing.suffix' properties must not be null or empty"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn audit_collection_name(&self, source_collection: &str) -> String {
        format!("{}{}{}", self.prefix, source_collection, self.suffix)
    }
}

impl FromEnv for AuditConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            enabled: env_bool_or_default("MONGODB_AUDIT_ENABLED", false)?,
            without_transaction: env_bool_or_default("MONGODB_AUDIT_WITHOUT_TRANSACTION", false)?,
            prefix: env_or_default("MONGODB_AUDIT_PREFIX", "").trim().to_string(),
            suffix: env_or_default("MONGODB_AUDIT_SUFFIX", DEFAULT_AUDIT_SUFFIX)
                .trim()
                .to_string(),
        };
        config.validate()?;
        Ok(config)
    }
}
