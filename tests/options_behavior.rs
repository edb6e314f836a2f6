//! Behavioural tests for the Cosmos options descriptor

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cosmos_orm::options::{ConnectionMode, WebProxy};
use cosmos_orm::resilience::{
    ExecutionStrategy, ExecutionStrategyDependencies, ExecutionStrategyFactory,
    NonRetryingExecutionStrategy,
};
use cosmos_orm::{ContextOptions, CosmosOptions, Error, OptionsExtension, OptionsExtensionInfo};

fn hash(options: &CosmosOptions) -> u64 {
    options.info().service_provider_hash_code()
}

#[test]
fn test_connection_string_after_endpoint_conflicts() {
    let original = CosmosOptions::new().with_account_endpoint("https://x").unwrap();

    let err = original
        .with_connection_string("AccountEndpoint=https://x;AccountKey=k")
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(
        err.context().and_then(|c| c.field_path.as_deref()),
        Some("options.connection_string")
    );
    assert_eq!(original.account_endpoint(), Some("https://x"));
    assert_eq!(original.connection_string(), None);
}

#[test]
fn test_endpoint_and_key_after_connection_string_conflict() {
    let original = CosmosOptions::new()
        .with_connection_string("AccountEndpoint=https://x;AccountKey=k")
        .unwrap();

    assert!(original.with_account_endpoint("https://x").unwrap_err().is_conflict());
    assert!(original.with_account_key("k").unwrap_err().is_conflict());
    assert_eq!(original.account_endpoint(), None);
    assert_eq!(original.account_key(), None);
}

#[test]
fn test_key_after_endpoint_is_allowed() {
    let options = CosmosOptions::new()
        .with_account_endpoint("https://x")
        .unwrap()
        .with_account_key("k")
        .unwrap();
    assert_eq!(options.account_endpoint(), Some("https://x"));
    assert_eq!(options.account_key(), Some("k"));
}

#[test]
fn test_with_operations_leave_source_untouched() {
    let source = CosmosOptions::new().with_database_name("Blogs");
    let derived = source
        .with_region("westus")
        .with_request_timeout(Duration::from_secs(10))
        .with_max_requests_per_tcp_connection(30);

    assert_eq!(source.region(), None);
    assert_eq!(source.request_timeout(), None);
    assert_eq!(derived.database_name(), Some("Blogs"));
    assert_eq!(derived.region(), Some("westus"));
    assert_eq!(derived.max_requests_per_tcp_connection(), Some(30));
}

#[test]
fn test_undefined_connection_mode_is_rejected() {
    let options = CosmosOptions::new();
    assert!(matches!(
        options.with_connection_mode(7),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        options.with_connection_mode("Tcp"),
        Err(Error::InvalidArgument { .. })
    ));
    assert_eq!(
        options.with_connection_mode(1).unwrap().connection_mode(),
        Some(ConnectionMode::Direct)
    );
    assert_eq!(options.connection_mode(), None);
}

#[test]
fn test_hash_ignores_call_order() {
    let a = CosmosOptions::new()
        .with_account_endpoint("https://x")
        .unwrap()
        .with_account_key("k")
        .unwrap()
        .with_region("westus")
        .with_database_name("Blogs")
        .with_connection_mode(ConnectionMode::Gateway)
        .unwrap();
    let b = CosmosOptions::new()
        .with_connection_mode(ConnectionMode::Gateway)
        .unwrap()
        .with_database_name("Blogs")
        .with_region("westus")
        .with_account_key("k")
        .unwrap()
        .with_account_endpoint("https://x")
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(hash(&a), hash(&b));
}

#[test]
fn test_hash_is_stable_across_copies_and_proxy_changes() {
    let base = CosmosOptions::new().with_connection_string("cs").unwrap();
    assert_eq!(hash(&base), hash(&base.clone()));

    let proxied = base.with_web_proxy(WebProxy::new("http://proxy:8080").unwrap());
    let bypassing = base.with_web_proxy(
        WebProxy::new("http://proxy:8080")
            .unwrap()
            .with_bypass_on_local(true),
    );
    assert_ne!(hash(&base), hash(&proxied));
    assert_ne!(hash(&proxied), hash(&bypassing));
}

#[test]
fn test_empty_connection_string_hashes_like_absent_identity() {
    let empty = CosmosOptions::new().with_connection_string("").unwrap();
    let none = CosmosOptions::new();
    assert_eq!(hash(&empty), hash(&none));

    let mut debug_info = BTreeMap::new();
    empty.info().populate_debug_info(&mut debug_info);
    assert_eq!(debug_info["Cosmos:AccountEndpoint"], "0");
    assert_eq!(debug_info["Cosmos:AccountKey"], "0");
    assert_eq!(debug_info["Cosmos:Region"], "0");
}

#[test]
fn test_execution_strategy_factory_is_compared_by_identity() {
    let factory: ExecutionStrategyFactory =
        Arc::new(|_deps: &ExecutionStrategyDependencies| -> Arc<dyn ExecutionStrategy> {
            Arc::new(NonRetryingExecutionStrategy)
        });
    let base = CosmosOptions::new().with_database_name("Blogs");
    let with_factory = base.with_execution_strategy_factory(Some(Arc::clone(&factory)));
    let same_factory = base.with_execution_strategy_factory(Some(factory));
    let other: ExecutionStrategyFactory =
        Arc::new(|_deps: &ExecutionStrategyDependencies| -> Arc<dyn ExecutionStrategy> {
            Arc::new(NonRetryingExecutionStrategy)
        });
    let other_factory = base.with_execution_strategy_factory(Some(other));

    assert_eq!(with_factory, same_factory);
    assert_ne!(with_factory, other_factory);
    assert_ne!(base, with_factory);
    assert_eq!(hash(&base), hash(&with_factory));
    assert!(!with_factory.create_execution_strategy().retries_on_failure());
    assert!(base.create_execution_strategy().retries_on_failure());
    assert!(with_factory
        .with_execution_strategy_factory(None)
        .execution_strategy_factory()
        .is_none());
}

#[test]
fn test_validate_accepts_single_provider() {
    let cosmos = CosmosOptions::new().with_connection_string("cs").unwrap();
    let context = ContextOptions::new().with_extension(cosmos.clone());
    assert!(cosmos.validate(&context).is_ok());
    assert!(context.validate().is_ok());
    assert!(cosmos.info().is_database_provider());
}
