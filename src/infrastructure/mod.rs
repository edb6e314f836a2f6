//! Options-extension infrastructure.
//!
//! A provider contributes an [`OptionsExtension`] to a [`ContextOptions`]
//! aggregate. The aggregate is validated once, hashed to pick a cached service
//! container, and asked to register services when no cached container exists.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`OptionsExtension`] | Provider-specific configuration plugged into the aggregate |
//! | [`OptionsExtensionInfo`] | Hash, debug info and log fragment derived from an extension |
//! | [`ContextOptions`] | Immutable set of extensions, one per concrete type |
//! | [`services`] | Service descriptors registered by providers |
//! | [`cache`] | Service containers cached by combined extension hash |

pub mod cache;
pub mod services;

pub use cache::{shared_cache, ServiceProviderCache};
pub use services::{ServiceCollection, ServiceDescriptor, ServiceLifetime};

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Result;

/// Derived, cacheable facts about an extension.
pub trait OptionsExtensionInfo: Send + Sync {
    /// True when the extension configures a database provider.
    fn is_database_provider(&self) -> bool;

    /// Two extensions with the same hash may share a service container.
    fn service_provider_hash_code(&self) -> u64;

    /// Write redacted diagnostics under provider-prefixed labels.
    fn populate_debug_info(&self, debug_info: &mut BTreeMap<String, String>);

    fn log_fragment(&self) -> &str;
}

pub trait OptionsExtension: Send + Sync + fmt::Debug {
    fn info(&self) -> &dyn OptionsExtensionInfo;

    /// Register this extension's services into `services`.
    fn apply_services(&self, services: &mut ServiceCollection);

    /// Called once after configuration with the full set of extensions.
    fn validate(&self, options: &ContextOptions) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Immutable collection of options extensions.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    extensions: Vec<Arc<dyn OptionsExtension>>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy holding `extension`, replacing any extension of the same type.
    pub fn with_extension<E: OptionsExtension + 'static>(&self, extension: E) -> Self {
        let mut extensions = self.extensions.clone();
        let extension: Arc<dyn OptionsExtension> = Arc::new(extension);
        match extensions
            .iter()
            .position(|existing| existing.as_any().is::<E>())
        {
            Some(index) => extensions[index] = extension,
            None => extensions.push(extension),
        }
        Self { extensions }
    }

    pub fn find_extension<E: OptionsExtension + 'static>(&self) -> Option<&E> {
        self.extensions
            .iter()
            .find_map(|ext| ext.as_any().downcast_ref::<E>())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &dyn OptionsExtension> + '_ {
        self.extensions.iter().map(|ext| &**ext)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Run every extension's validation hook.
    pub fn validate(&self) -> Result<()> {
        for ext in self.extensions() {
            ext.validate(self)?;
        }
        Ok(())
    }

    /// Order-sensitive combination of the extension hashes.
    pub fn service_provider_hash_code(&self) -> u64 {
        self.extensions().fold(0u64, |hash, ext| {
            hash.wrapping_mul(397) ^ ext.info().service_provider_hash_code()
        })
    }

    pub fn debug_info(&self) -> BTreeMap<String, String> {
        let mut debug_info = BTreeMap::new();
        for ext in self.extensions() {
            ext.info().populate_debug_info(&mut debug_info);
        }
        debug_info
    }

    pub fn log_fragment(&self) -> String {
        self.extensions().map(|ext| ext.info().log_fragment()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CosmosOptions;

    #[test]
    fn with_extension_replaces_same_type() {
        let first = CosmosOptions::new().with_database_name("A");
        let second = CosmosOptions::new().with_database_name("B");

        let options = ContextOptions::new().with_extension(first);
        let replaced = options.with_extension(second);

        assert_eq!(options.len(), 1);
        assert_eq!(replaced.len(), 1);
        assert_eq!(
            options.find_extension::<CosmosOptions>().and_then(|o| o.database_name()),
            Some("A")
        );
        assert_eq!(
            replaced.find_extension::<CosmosOptions>().and_then(|o| o.database_name()),
            Some("B")
        );
    }

    #[test]
    fn log_fragment_concatenates_extensions() {
        let options = ContextOptions::new().with_extension(
            CosmosOptions::new()
                .with_account_endpoint("https://x")
                .unwrap()
                .with_database_name("Db"),
        );
        assert_eq!(options.log_fragment(), "ServiceEndPoint=https://x Database=Db ");
        assert_eq!(options.debug_info().len(), 3);
    }
}
