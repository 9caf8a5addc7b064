//! MongoDB test infrastructure
//!
//! Provides a `TestMongo` helper backed by a single-node replica set, so
//! multi-document transactions are available.

use mongodb::{Client, Database, bson::doc};
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;

/// Test MongoDB wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestMongo {
    #[allow(dead_code)]
    container: ContainerAsync<Mongo>,
    pub client: Client,
    pub connection_string: String,
}

impl TestMongo {
    /// Start a replica-set MongoDB container
    ///
    /// # Example
    ///
    /// ```no_run
    /// use test_utils::TestMongo;
    ///
    /// # async fn example() {
    /// let mongo = TestMongo::new().await;
    /// let db = mongo.database("my_test");
    /// # }
    /// ```
    pub async fn new() -> Self {
        let container = Mongo::repl_set()
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let host_port = container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get host port");

        let connection_string = format!(
            "mongodb://127.0.0.1:{}/?directConnection=true",
            host_port
        );

        let client = Client::with_uri_str(&connection_string)
            .await
            .expect("Failed to create MongoDB client");

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .expect("MongoDB did not answer ping");

        tracing::info!(port = host_port, "Test MongoDB ready (replica set)");

        Self {
            container,
            client,
            connection_string,
        }
    }

    /// Database handle, isolated per test by name
    pub fn database(&self, name: &str) -> Database {
        self.client.database(name)
    }
}
