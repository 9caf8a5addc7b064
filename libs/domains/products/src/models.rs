use chrono::{DateTime, Utc};
use mongo_audit::{Auditable, DEFAULT_PAGE_SIZE, INITIAL_VERSION, PageMetadata, PageRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const MAX_TAGS: usize = 5;

#[allow(clippy::ptr_arg)]
fn validate_tags(tags: &Vec<String>) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::new("too_many_tags"));
    }
    if tags.iter().any(|tag| !(2..=10).contains(&tag.chars().count())) {
        return Err(ValidationError::new("invalid_tag_length"));
    }
    Ok(())
}

fn validate_attributes(attributes: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    let valid = attributes.iter().all(|(key, value)| {
        (2..=50).contains(&key.chars().count()) && (2..=256).contains(&value.chars().count())
    });
    if !valid {
        return Err(ValidationError::new("invalid_attribute"));
    }
    Ok(())
}

/// Product entity - represents a product stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form labels, searchable
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Optimistic lock, 0 on creation and bumped by every update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auditable for Product {
    const COLLECTION: &'static str = "products";
    const VERSION_FIELD: Option<&'static str> = Some("version");
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 2, max = 256))]
    pub name: String,
    #[validate(length(min = 2, max = 256))]
    pub description: Option<String>,
    /// At most 5 tags of 2 to 10 characters
    #[validate(custom(function = "validate_tags"))]
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "validate_attributes"))]
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// DTO for partially updating a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 2, max = 256))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 256))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    #[validate(custom(function = "validate_attributes"))]
    pub attributes: Option<BTreeMap<String, String>>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.attributes.is_none()
    }
}

/// Query parameters for listing products
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Comma-separated phrases matched against name, description and tags
    pub phrases: Option<String>,
    /// Zero-based page index
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_size")]
    #[param(default = 16)]
    pub size: u64,
}

fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ProductListParams {
    fn default() -> Self {
        Self {
            phrases: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductListParams {
    pub fn phrases(&self) -> Vec<String> {
        self.phrases
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// Paginated product listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductPage {
    pub content: Vec<Product>,
    pub page: PageMetadata,
}

impl Product {
    /// Create a new product from CreateProduct DTO
    pub fn new(input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            tags: input.tags,
            attributes: input.attributes,
            version: INITIAL_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates from UpdateProduct DTO and bump the version
    pub fn apply_update(&mut self, update: UpdateProduct) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(attributes) = update.attributes {
            self.attributes = attributes;
        }
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
