//! Tests for service registration and the service provider cache

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use cosmos_orm::infrastructure::{ServiceCollection, ServiceProviderCache};
use cosmos_orm::{
    ContextOptions, CosmosOptions, Error, OptionsConfig, OptionsExtension, OptionsExtensionInfo,
};

/// A second database provider, used to trigger the single-provider check.
#[derive(Debug)]
struct InMemoryProvider;

impl OptionsExtensionInfo for InMemoryProvider {
    fn is_database_provider(&self) -> bool {
        true
    }

    fn service_provider_hash_code(&self) -> u64 {
        42
    }

    fn populate_debug_info(&self, debug_info: &mut BTreeMap<String, String>) {
        debug_info.insert("InMemory:Enabled".into(), "1".into());
    }

    fn log_fragment(&self) -> &str {
        "InMemory "
    }
}

impl OptionsExtension for InMemoryProvider {
    fn info(&self) -> &dyn OptionsExtensionInfo {
        self
    }

    fn apply_services(&self, _services: &mut ServiceCollection) {}

    fn validate(&self, _options: &ContextOptions) -> cosmos_orm::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn cosmos(database: &str) -> CosmosOptions {
    CosmosOptions::new()
        .with_account_endpoint("https://localhost:8081")
        .unwrap()
        .with_account_key("c2VjcmV0")
        .unwrap()
        .with_database_name(database)
}

#[test]
fn test_equal_hashes_share_services() {
    let cache = ServiceProviderCache::default();
    let first = ContextOptions::new().with_extension(cosmos("Blogs"));
    let second = ContextOptions::new().with_extension(cosmos("Blogs"));

    let a = cache.get_or_add(&first).unwrap();
    let b = cache.get_or_add(&second).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
    assert!(a.contains("DatabaseProvider"));
    assert!(a.contains("ExecutionStrategyFactory"));
}

#[test]
fn test_different_hashes_get_separate_services() {
    let cache = ServiceProviderCache::default();
    let a = cache
        .get_or_add(&ContextOptions::new().with_extension(cosmos("Blogs")))
        .unwrap();
    let b = cache
        .get_or_add(&ContextOptions::new().with_extension(cosmos("Orders")))
        .unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_second_database_provider_is_rejected() {
    let cache = ServiceProviderCache::default();
    let options = ContextOptions::new()
        .with_extension(cosmos("Blogs"))
        .with_extension(InMemoryProvider);

    let err = cache.get_or_add(&options).unwrap_err();
    assert!(matches!(err, Error::ConfigurationConflict { .. }));
    assert!(cache.is_empty());
}

#[test]
fn test_context_diagnostics_combine_extensions() {
    let options = ContextOptions::new()
        .with_extension(cosmos("Blogs"))
        .with_extension(InMemoryProvider);

    assert_eq!(
        options.log_fragment(),
        "ServiceEndPoint=https://localhost:8081 Database=Blogs InMemory "
    );
    let debug_info = options.debug_info();
    assert!(debug_info.contains_key("Cosmos:AccountKey"));
    assert!(debug_info.contains_key("InMemory:Enabled"));
}

#[test]
fn test_conflicting_yaml_surfaces_conflict() {
    let config = OptionsConfig::from_yaml_str(
        r#"
account_endpoint: https://localhost:8081
connection_string: AccountEndpoint=https://localhost:8081;AccountKey=c2VjcmV0
"#,
    )
    .unwrap();

    let err = config.into_options().unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn test_unknown_connection_mode_in_config() {
    let config = OptionsConfig::from_json_str(r#"{"connection_mode": "Tcp"}"#).unwrap();
    assert!(matches!(
        config.into_options(),
        Err(Error::InvalidArgument { .. })
    ));
}
