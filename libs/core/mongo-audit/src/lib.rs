//! # MongoDB auditing
//!
//! Captures every write to registered collections as an append-only audit
//! record in a companion collection, numbered with gap-free revisions.
//!
//! - [`AuditRegistry`]: source collection → audit collection, frozen at startup
//! - [`AuditCollectionBootstrapper`]: creates audit collections and their indexes
//! - [`AuditEventListener`]: called by repositories after each write, inside the
//!   write's session
//! - [`RevisionAllocator`]: `count + 1` revisions, retried on unique-index conflicts
//! - [`TransactionRetry`]: reruns a write and its audit when the transaction conflicts
//! - [`AuditQueryService`] and [`handlers`]: the read side
//!
//! ```ignore
//! let registry = AuditRegistry::builder()
//!     .register::<Product>()
//!     .build(&config.audit)?;
//! AuditCollectionBootstrapper::new(MongoAuditStore::new(&db), registry.clone())
//!     .run()
//!     .await?;
//! let listener = Arc::new(AuditEventListener::new(registry, &config.audit));
//! ```

pub mod actor;
pub mod allocator;
pub mod bootstrap;
pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod handlers;
pub mod listener;
pub mod mongodb;
pub mod page;
pub mod query;
pub mod record;
pub mod registry;
pub mod store;
pub mod transaction;

pub use actor::{ActorProvider, StaticActor, TaskLocalActor, actor_middleware, scope_actor};
pub use allocator::{MAX_REVISION_ATTEMPTS, RevisionAllocator};
pub use bootstrap::{AuditCollectionBootstrapper, BootstrapReport};
pub use config::AuditConfig;
pub use entity::{Auditable, INITIAL_VERSION};
pub use error::{AuditError, AuditResult};
pub use event::{WriteEvent, WriteKind};
pub use handlers::ApiDoc;
pub use listener::{AuditEventListener, AuditOutcome};
pub use self::mongodb::{MongoAuditStore, MongoAuditWriter};
pub use page::{DEFAULT_PAGE_SIZE, Page, PageMetadata, PageRequest};
pub use query::{AuditQuery, AuditQueryService};
pub use record::{AuditEntry, AuditRecord, AuditType, SYSTEM_ACTOR};
pub use registry::{AuditMetadata, AuditRegistry, AuditRegistryBuilder};
pub use store::{AuditFilter, AuditIndex, AuditStore, AuditWriter};
pub use transaction::{TransactionRetry, TransientError};
