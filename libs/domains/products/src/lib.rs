//! Products Domain
//!
//! CRUD for products stored in MongoDB. Every write is audited through
//! [`mongo_audit::AuditEventListener`] inside the same transaction as the
//! write itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Business logic, validation
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access + audit notification
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{handlers, MongoProductRepository, Product, ProductService};
//! use mongo_audit::{AuditConfig, AuditEventListener, AuditRegistry};
//! use mongodb::Client;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017/?replicaSet=rs0").await?;
//! let db = client.database("mydb");
//!
//! let config = AuditConfig::enabled();
//! let registry = AuditRegistry::builder().register::<Product>().build(&config)?;
//! let listener = Arc::new(AuditEventListener::new(registry, &config));
//!
//! let repository = MongoProductRepository::new(&client, &db, listener);
//! let router = handlers::router(ProductService::new(repository));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use models::{CreateProduct, Product, ProductListParams, ProductPage, UpdateProduct};
pub use self::mongodb::MongoProductRepository;
pub use repository::ProductRepository;
pub use service::ProductService;
