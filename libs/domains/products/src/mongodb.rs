//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use mongo_audit::{
    AuditEventListener, Auditable, MongoAuditWriter, Page, PageRequest, TransactionRetry,
};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{Document, doc, to_bson, to_document},
    error::UNKNOWN_TRANSACTION_COMMIT_RESULT,
    options::{FindOptions, IndexOptions},
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{CreateProduct, Product};
use crate::repository::ProductRepository;

/// Commit attempts while the server cannot tell whether a commit went through
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Session and transaction wrapping one product write and its audit record.
struct WriteScope {
    session: Option<ClientSession>,
}

impl WriteScope {
    async fn begin(client: &Client, transactional: bool) -> ProductResult<Self> {
        if !transactional {
            return Ok(Self { session: None });
        }

        let mut session = client.start_session().await?;
        session.start_transaction().await?;
        Ok(Self {
            session: Some(session),
        })
    }

    fn audit_writer<'a>(&'a mut self, db: &'a Database) -> MongoAuditWriter<'a> {
        match self.session.as_mut() {
            Some(session) => MongoAuditWriter::transactional(db, session),
            None => MongoAuditWriter::standalone(db),
        }
    }

    /// Commits on success, aborts on failure.
    ///
    /// A commit whose outcome is unknown is repeated, commits are idempotent.
    /// A commit rejected with a transient label surfaces as
    /// [`ProductError::WriteConflict`] so the caller reruns the transaction.
    async fn finish<T>(mut self, result: ProductResult<T>) -> ProductResult<T> {
        let Some(session) = self.session.as_mut() else {
            return result;
        };

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!(error = %abort_err, "Failed to abort product transaction");
                }
                return Err(err);
            }
        };

        let mut attempt = 1;
        loop {
            match session.commit_transaction().await {
                Ok(()) => return Ok(value),
                Err(err)
                    if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                        && attempt < MAX_COMMIT_ATTEMPTS =>
                {
                    warn!(attempt, error = %err, "Commit result unknown, committing again");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// MongoDB implementation of the ProductRepository
pub struct MongoProductRepository {
    client: Client,
    db: Database,
    collection: Collection<Product>,
    audit: Arc<AuditEventListener>,
    transactional: bool,
    retry: TransactionRetry,
}

impl MongoProductRepository {
    /// Writes run in a transaction unless the listener allows auditing
    /// without one.
    pub fn new(client: &Client, db: &Database, audit: Arc<AuditEventListener>) -> Self {
        Self {
            client: client.clone(),
            db: db.clone(),
            collection: db.collection::<Product>(Product::COLLECTION),
            transactional: !audit.without_transaction(),
            audit,
            retry: TransactionRetry::default(),
        }
    }

    /// How often a write and its audit are rerun after a write conflict
    pub fn with_transaction_retry(mut self, retry: TransactionRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Initialize indexes for optimal query performance
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            // Text search on name, tags and description
            IndexModel::builder()
                .keys(doc! { "name": "text", "tags": "text", "description": "text" })
                .options(
                    IndexOptions::builder()
                        .name("idx_text_search".to_string())
                        .weights(doc! { "name": 3, "tags": 2, "description": 1 })
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "created_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_created_at".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    fn id_filter(id: Uuid) -> ProductResult<Document> {
        Ok(doc! { "_id": to_bson(&id)? })
    }

    /// Build the text search filter and sort for the given phrases
    fn build_filter(phrases: &[String]) -> (Document, Document) {
        if phrases.is_empty() {
            return (doc! {}, doc! { "created_at": -1 });
        }

        (
            doc! { "$text": { "$search": phrases.join(" ") } },
            doc! { "score": { "$meta": "textScore" } },
        )
    }

    async fn create_once(&self, product: &Product, document: &Document) -> ProductResult<()> {
        let mut scope = WriteScope::begin(&self.client, self.transactional).await?;
        let result: ProductResult<()> = async {
            match scope.session.as_mut() {
                Some(session) => self.collection.insert_one(product).session(session).await?,
                None => self.collection.insert_one(product).await?,
            };

            let mut writer = scope.audit_writer(&self.db);
            self.audit
                .on_after_save(&mut writer, Product::COLLECTION, document)
                .await?;
            Ok(())
        }
        .await;

        scope.finish(result).await
    }

    async fn update_once(
        &self,
        filter: &Document,
        product: &Product,
        document: &Document,
        expected_version: i64,
    ) -> ProductResult<()> {
        let mut scope = WriteScope::begin(&self.client, self.transactional).await?;
        let result: ProductResult<()> = async {
            let replaced = match scope.session.as_mut() {
                Some(session) => {
                    self.collection
                        .replace_one(filter.clone(), product)
                        .session(session)
                        .await?
                }
                None => self.collection.replace_one(filter.clone(), product).await?,
            };

            if replaced.matched_count == 0 {
                return Err(ProductError::VersionConflict {
                    id: product.id,
                    expected: expected_version,
                });
            }

            let mut writer = scope.audit_writer(&self.db);
            self.audit
                .on_after_save(&mut writer, Product::COLLECTION, document)
                .await?;
            Ok(())
        }
        .await;

        scope.finish(result).await
    }

    async fn delete_once(&self, filter: &Document) -> ProductResult<bool> {
        let mut scope = WriteScope::begin(&self.client, self.transactional).await?;
        let result: ProductResult<bool> = async {
            let deleted = match scope.session.as_mut() {
                Some(session) => {
                    self.collection
                        .find_one_and_delete(filter.clone())
                        .session(session)
                        .await?
                }
                None => self.collection.find_one_and_delete(filter.clone()).await?,
            };

            let Some(deleted) = deleted else {
                return Ok(false);
            };

            let document = to_document(&deleted)?;
            let mut writer = scope.audit_writer(&self.db);
            self.audit
                .on_after_delete(&mut writer, Product::COLLECTION, &document)
                .await?;
            Ok(true)
        }
        .await;

        scope.finish(result).await
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    async fn create(&self, input: CreateProduct) -> ProductResult<Product> {
        let product = Product::new(input);
        let document = to_document(&product)?;

        self.retry
            .run(|| self.create_once(&product, &document))
            .await?;

        tracing::info!(product_id = %product.id, "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let product = self.collection.find_one(Self::id_filter(id)?).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list(&self, phrases: Vec<String>, page: PageRequest) -> ProductResult<Page<Product>> {
        use futures_util::TryStreamExt;

        let (filter, sort) = Self::build_filter(&phrases);

        let total = self.collection.count_documents(filter.clone()).await?;
        if total == 0 {
            return Ok(Page::empty(page));
        }

        let page = page.normalize(total);
        let options = FindOptions::builder()
            .sort(sort)
            .skip(page.offset())
            .limit(page.limit())
            .build();

        let cursor = self.collection.find(filter).with_options(options).await?;
        let products: Vec<Product> = cursor.try_collect().await?;

        Ok(Page::new(products, page, total))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn update(&self, product: Product, expected_version: i64) -> ProductResult<Product> {
        let mut filter = Self::id_filter(product.id)?;
        filter.insert("version", expected_version);
        let document = to_document(&product)?;

        // A rerun after a lost conflict no longer matches the expected
        // version and ends in VersionConflict
        self.retry
            .run(|| self.update_once(&filter, &product, &document, expected_version))
            .await?;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ProductResult<bool> {
        let filter = Self::id_filter(id)?;

        self.retry.run(|| self.delete_once(&filter)).await
    }
}
