//! Cosmos provider options.
//!
//! [`CosmosOptions`] is an immutable descriptor: every `with_*` call returns a
//! fresh copy and leaves the source untouched. The account endpoint/key pair and
//! the connection string are mutually exclusive, and the conflict is reported at
//! the moment the second group is set.
//!
//! ```rust
//! use cosmos_orm::options::{ConnectionMode, CosmosOptions};
//!
//! let options = CosmosOptions::new()
//!     .with_account_endpoint("https://localhost:8081")?
//!     .with_account_key("c2VjcmV0")?
//!     .with_database_name("Blogs")
//!     .with_connection_mode(ConnectionMode::Gateway)?;
//!
//! assert!(options.with_connection_string("AccountEndpoint=...").is_err());
//! # Ok::<(), cosmos_orm::Error>(())
//! ```

pub mod config;
pub mod info;
pub mod proxy;

pub use config::OptionsConfig;
pub use info::{ExtensionInfo, StableHash, DEBUG_INFO_PREFIX};
pub use proxy::WebProxy;

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::infrastructure::services::{ServiceCollection, ServiceDescriptor, ServiceLifetime};
use crate::infrastructure::{ContextOptions, OptionsExtension, OptionsExtensionInfo};
use crate::resilience::{
    ExecutionStrategy, ExecutionStrategyDependencies, ExecutionStrategyFactory,
    RetryingExecutionStrategy,
};
use crate::{Error, ErrorContext, Result};

const CONFLICTING_IDENTITY: &str = "Both the connection string and the account key or account endpoint were specified. \
     Only specify one set of connection details.";

/// Transport used by the Cosmos client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConnectionMode {
    Gateway = 0,
    Direct = 1,
}

impl ConnectionMode {
    pub const ALL: [ConnectionMode; 2] = [ConnectionMode::Gateway, ConnectionMode::Direct];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Gateway => "Gateway",
            ConnectionMode::Direct => "Direct",
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for ConnectionMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        ConnectionMode::ALL
            .into_iter()
            .find(|mode| *mode as i32 == value)
            .ok_or_else(|| {
                Error::invalid_argument(
                    "connection_mode",
                    format!("{} is not a defined connection mode", value),
                )
            })
    }
}

impl FromStr for ConnectionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConnectionMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::invalid_argument(
                    "connection_mode",
                    format!("'{}' is not a defined connection mode", s),
                )
            })
    }
}

/// Values accepted by [`CosmosOptions::with_connection_mode`].
///
/// Raw discriminants and names coming from configuration are checked against
/// the closed set of modes.
pub trait IntoConnectionMode {
    fn into_connection_mode(self) -> Result<ConnectionMode>;
}

impl IntoConnectionMode for ConnectionMode {
    fn into_connection_mode(self) -> Result<ConnectionMode> {
        Ok(self)
    }
}

impl IntoConnectionMode for i32 {
    fn into_connection_mode(self) -> Result<ConnectionMode> {
        ConnectionMode::try_from(self)
    }
}

impl IntoConnectionMode for &str {
    fn into_connection_mode(self) -> Result<ConnectionMode> {
        self.parse()
    }
}

/// Plain configuration values. Shared between a descriptor and its info.
#[derive(Clone, Default, PartialEq, Eq)]
pub(crate) struct CosmosSettings {
    pub(crate) account_endpoint: Option<String>,
    pub(crate) account_key: Option<String>,
    pub(crate) connection_string: Option<String>,
    pub(crate) database_name: Option<String>,
    pub(crate) region: Option<String>,
    pub(crate) connection_mode: Option<ConnectionMode>,
    pub(crate) limit_to_endpoint: Option<bool>,
    pub(crate) web_proxy: Option<WebProxy>,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) open_tcp_connection_timeout: Option<Duration>,
    pub(crate) idle_tcp_connection_timeout: Option<Duration>,
    pub(crate) gateway_mode_max_connection_limit: Option<u32>,
    pub(crate) max_tcp_connections_per_endpoint: Option<u32>,
    pub(crate) max_requests_per_tcp_connection: Option<u32>,
}

// Secrets never reach Debug output.
impl fmt::Debug for CosmosSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosSettings")
            .field("account_endpoint", &self.account_endpoint)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("database_name", &self.database_name)
            .field("region", &self.region)
            .field("connection_mode", &self.connection_mode)
            .field("limit_to_endpoint", &self.limit_to_endpoint)
            .field("web_proxy", &self.web_proxy)
            .field("request_timeout", &self.request_timeout)
            .field("open_tcp_connection_timeout", &self.open_tcp_connection_timeout)
            .field("idle_tcp_connection_timeout", &self.idle_tcp_connection_timeout)
            .field(
                "gateway_mode_max_connection_limit",
                &self.gateway_mode_max_connection_limit,
            )
            .field(
                "max_tcp_connections_per_endpoint",
                &self.max_tcp_connections_per_endpoint,
            )
            .field(
                "max_requests_per_tcp_connection",
                &self.max_requests_per_tcp_connection,
            )
            .finish()
    }
}

/// Immutable Cosmos provider configuration.
pub struct CosmosOptions {
    settings: Arc<CosmosSettings>,
    execution_strategy_factory: Option<ExecutionStrategyFactory>,
    info: OnceCell<ExtensionInfo>,
}

impl CosmosOptions {
    pub fn new() -> Self {
        Self {
            settings: Arc::new(CosmosSettings::default()),
            execution_strategy_factory: None,
            info: OnceCell::new(),
        }
    }

    /// Copy every field, then apply `update` to the copy.
    fn clone_with(&self, update: impl FnOnce(&mut CosmosSettings)) -> Self {
        let mut settings = CosmosSettings::clone(&self.settings);
        update(&mut settings);
        Self {
            settings: Arc::new(settings),
            execution_strategy_factory: self.execution_strategy_factory.clone(),
            info: OnceCell::new(),
        }
    }

    fn conflict(field: &str) -> Error {
        warn!(field, "rejected conflicting Cosmos connection details");
        Error::conflict_with_context(
            CONFLICTING_IDENTITY,
            ErrorContext::new()
                .with_field_path(format!("options.{}", field))
                .with_source("cosmos_options"),
        )
    }

    /// Derived info, computed on first use and cached for this descriptor.
    pub fn info(&self) -> &ExtensionInfo {
        self.info
            .get_or_init(|| ExtensionInfo::new(Arc::clone(&self.settings)))
    }

    pub fn account_endpoint(&self) -> Option<&str> {
        self.settings.account_endpoint.as_deref()
    }

    pub fn with_account_endpoint(&self, account_endpoint: impl Into<String>) -> Result<Self> {
        if self.settings.connection_string.is_some() {
            return Err(Self::conflict("account_endpoint"));
        }
        let account_endpoint = account_endpoint.into();
        Ok(self.clone_with(|s| s.account_endpoint = Some(account_endpoint)))
    }

    pub fn account_key(&self) -> Option<&str> {
        self.settings.account_key.as_deref()
    }

    pub fn with_account_key(&self, account_key: impl Into<String>) -> Result<Self> {
        if self.settings.connection_string.is_some() {
            return Err(Self::conflict("account_key"));
        }
        let account_key = account_key.into();
        Ok(self.clone_with(|s| s.account_key = Some(account_key)))
    }

    pub fn connection_string(&self) -> Option<&str> {
        self.settings.connection_string.as_deref()
    }

    pub fn with_connection_string(&self, connection_string: impl Into<String>) -> Result<Self> {
        if self.settings.account_endpoint.is_some() || self.settings.account_key.is_some() {
            return Err(Self::conflict("connection_string"));
        }
        let connection_string = connection_string.into();
        Ok(self.clone_with(|s| s.connection_string = Some(connection_string)))
    }

    pub fn database_name(&self) -> Option<&str> {
        self.settings.database_name.as_deref()
    }

    pub fn with_database_name(&self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.clone_with(|s| s.database_name = Some(database))
    }

    pub fn region(&self) -> Option<&str> {
        self.settings.region.as_deref()
    }

    pub fn with_region(&self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.clone_with(|s| s.region = Some(region))
    }

    pub fn limit_to_endpoint(&self) -> Option<bool> {
        self.settings.limit_to_endpoint
    }

    pub fn with_limit_to_endpoint(&self, enable: bool) -> Self {
        self.clone_with(|s| s.limit_to_endpoint = Some(enable))
    }

    pub fn connection_mode(&self) -> Option<ConnectionMode> {
        self.settings.connection_mode
    }

    /// Fails with [`Error::InvalidArgument`] when `mode` is not a defined mode.
    pub fn with_connection_mode(&self, mode: impl IntoConnectionMode) -> Result<Self> {
        let mode = mode.into_connection_mode()?;
        Ok(self.clone_with(|s| s.connection_mode = Some(mode)))
    }

    pub fn web_proxy(&self) -> Option<&WebProxy> {
        self.settings.web_proxy.as_ref()
    }

    pub fn with_web_proxy(&self, proxy: WebProxy) -> Self {
        self.clone_with(|s| s.web_proxy = Some(proxy))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.settings.request_timeout
    }

    pub fn with_request_timeout(&self, timeout: Duration) -> Self {
        self.clone_with(|s| s.request_timeout = Some(timeout))
    }

    pub fn open_tcp_connection_timeout(&self) -> Option<Duration> {
        self.settings.open_tcp_connection_timeout
    }

    pub fn with_open_tcp_connection_timeout(&self, timeout: Duration) -> Self {
        self.clone_with(|s| s.open_tcp_connection_timeout = Some(timeout))
    }

    pub fn idle_tcp_connection_timeout(&self) -> Option<Duration> {
        self.settings.idle_tcp_connection_timeout
    }

    pub fn with_idle_tcp_connection_timeout(&self, timeout: Duration) -> Self {
        self.clone_with(|s| s.idle_tcp_connection_timeout = Some(timeout))
    }

    pub fn gateway_mode_max_connection_limit(&self) -> Option<u32> {
        self.settings.gateway_mode_max_connection_limit
    }

    pub fn with_gateway_mode_max_connection_limit(&self, connection_limit: u32) -> Self {
        self.clone_with(|s| s.gateway_mode_max_connection_limit = Some(connection_limit))
    }

    pub fn max_tcp_connections_per_endpoint(&self) -> Option<u32> {
        self.settings.max_tcp_connections_per_endpoint
    }

    pub fn with_max_tcp_connections_per_endpoint(&self, connection_limit: u32) -> Self {
        self.clone_with(|s| s.max_tcp_connections_per_endpoint = Some(connection_limit))
    }

    pub fn max_requests_per_tcp_connection(&self) -> Option<u32> {
        self.settings.max_requests_per_tcp_connection
    }

    pub fn with_max_requests_per_tcp_connection(&self, request_limit: u32) -> Self {
        self.clone_with(|s| s.max_requests_per_tcp_connection = Some(request_limit))
    }

    pub fn execution_strategy_factory(&self) -> Option<&ExecutionStrategyFactory> {
        self.execution_strategy_factory.as_ref()
    }

    /// Replace the retry-strategy factory; `None` clears it.
    pub fn with_execution_strategy_factory(
        &self,
        factory: Option<ExecutionStrategyFactory>,
    ) -> Self {
        let mut clone = self.clone_with(|_| {});
        clone.execution_strategy_factory = factory;
        clone
    }

    /// Build the execution strategy for these options.
    ///
    /// Falls back to [`RetryingExecutionStrategy`] with its defaults when no
    /// factory has been configured.
    pub fn create_execution_strategy(&self) -> Arc<dyn ExecutionStrategy> {
        let dependencies = ExecutionStrategyDependencies::from_options(self);
        match &self.execution_strategy_factory {
            Some(factory) => factory(&dependencies),
            None => Arc::new(RetryingExecutionStrategy::default()),
        }
    }
}

impl Default for CosmosOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CosmosOptions {
    fn clone(&self) -> Self {
        self.clone_with(|_| {})
    }
}

impl PartialEq for CosmosOptions {
    fn eq(&self, other: &Self) -> bool {
        let same_factory = match (&self.execution_strategy_factory, &other.execution_strategy_factory) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_factory && self.settings == other.settings
    }
}

impl fmt::Debug for CosmosOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosOptions")
            .field("settings", &self.settings)
            .field(
                "execution_strategy_factory",
                &self.execution_strategy_factory.as_ref().map(|_| "<factory>"),
            )
            .finish()
    }
}

const COSMOS_SERVICES: &[ServiceDescriptor] = &[
    ServiceDescriptor::new("DatabaseProvider", "CosmosDatabaseProvider", ServiceLifetime::Singleton),
    ServiceDescriptor::new("SingletonOptions", "CosmosSingletonOptions", ServiceLifetime::Singleton),
    ServiceDescriptor::new("TypeMappingSource", "CosmosTypeMappingSource", ServiceLifetime::Singleton),
    ServiceDescriptor::new("ModelValidator", "CosmosModelValidator", ServiceLifetime::Singleton),
    ServiceDescriptor::new("Database", "CosmosDatabaseWrapper", ServiceLifetime::Scoped),
    ServiceDescriptor::new("DatabaseCreator", "CosmosDatabaseCreator", ServiceLifetime::Scoped),
    ServiceDescriptor::new("ClientWrapper", "CosmosClientWrapper", ServiceLifetime::Scoped),
    ServiceDescriptor::new(
        "ExecutionStrategyFactory",
        "CosmosExecutionStrategyFactory",
        ServiceLifetime::Scoped,
    ),
    ServiceDescriptor::new("TransactionManager", "CosmosTransactionManager", ServiceLifetime::Scoped),
];

impl OptionsExtension for CosmosOptions {
    fn info(&self) -> &dyn OptionsExtensionInfo {
        CosmosOptions::info(self)
    }

    fn apply_services(&self, services: &mut ServiceCollection) {
        let added = COSMOS_SERVICES
            .iter()
            .filter(|descriptor| services.try_add((*descriptor).clone()))
            .count();
        tracing::info!(added, "registered Cosmos provider services");
    }

    fn validate(&self, options: &ContextOptions) -> Result<()> {
        let providers = options
            .extensions()
            .filter(|ext| ext.info().is_database_provider())
            .count();
        if providers > 1 {
            return Err(Error::conflict_with_context(
                "Multiple database providers are configured. Only a single database provider can be used.",
                ErrorContext::new()
                    .with_details(format!("{} database providers found", providers))
                    .with_source("cosmos_options"),
            ));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
