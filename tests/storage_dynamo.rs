//! DynamoDB table store contract tests using testcontainers.
//!
//! Run with: cargo test --test storage_dynamo --features dynamo -- --nocapture
//!
//! Starts DynamoDB Local in a container unless `DYNAMO_ENDPOINT` points at
//! a running instance (LocalStack or DynamoDB Local). Each run creates its
//! own table.

mod table_store;

use std::time::Duration;

use eventro::storage::DynamoTableStore;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

/// Start DynamoDB Local.
///
/// Returns (container, endpoint_url).
async fn start_dynamo() -> (ContainerAsync<GenericImage>, String) {
    let container = GenericImage::new("amazon/dynamodb-local", "2.5.2")
        .with_exposed_port(8000.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Initializing DynamoDB Local"))
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await
        .expect("Failed to start dynamodb-local container");

    let host_port = container
        .get_host_port_ipv4(8000)
        .await
        .expect("Failed to get mapped port");
    let host = container
        .get_host()
        .await
        .expect("Failed to get container host");

    let endpoint = format!("http://{}:{}", host, host_port);
    println!("DynamoDB Local available at: {}", endpoint);
    (container, endpoint)
}

#[tokio::test]
async fn test_dynamo_table_store() {
    println!("=== DynamoDB TableStore Tests ===");

    // Local endpoints accept any credentials, but the SDK insists on some.
    if std::env::var("AWS_ACCESS_KEY_ID").is_err() {
        std::env::set_var("AWS_ACCESS_KEY_ID", "test");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");
    }

    let (_container, endpoint) = match std::env::var("DYNAMO_ENDPOINT") {
        Ok(endpoint) => (None, endpoint),
        Err(_) => {
            println!("Starting DynamoDB Local container...");
            let (container, endpoint) = start_dynamo().await;
            (Some(container), endpoint)
        }
    };

    let table = format!("eventro_test_{}", uuid::Uuid::new_v4().simple());
    let store = DynamoTableStore::new(table.as_str(), Some(endpoint.as_str()), Some("us-east-1"))
        .await
        .expect("Failed to connect to DynamoDB");
    store.ensure_table().await.expect("Failed to create table");

    run_table_store_tests!(&store);

    println!("=== All DynamoDB TableStore tests PASSED ===");
}
