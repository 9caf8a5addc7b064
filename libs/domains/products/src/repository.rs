use async_trait::async_trait;
use mongo_audit::{Page, PageRequest};
use uuid::Uuid;

use crate::error::ProductResult;
use crate::models::{CreateProduct, Product};

/// Repository trait for Product persistence
///
/// Every write is expected to notify the audit listener before it is
/// committed, so a failed audit append rolls the write back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Create a new product
    async fn create(&self, input: CreateProduct) -> ProductResult<Product>;

    /// Get a product by ID
    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>>;

    /// Page of products, optionally matching any of `phrases`
    async fn list(&self, phrases: Vec<String>, page: PageRequest) -> ProductResult<Page<Product>>;

    /// Replace `product` if the stored version still equals `expected_version`
    async fn update(&self, product: Product, expected_version: i64) -> ProductResult<Product>;

    /// Delete a product by ID, returning whether it existed
    async fn delete(&self, id: Uuid) -> ProductResult<bool>;
}
