//! Loading Cosmos options from files and the environment.
//!
//! Every present field is applied through the regular `with_*` operations, so a
//! file that sets both an endpoint and a connection string fails exactly like
//! the equivalent code would.
//!
//! Environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `COSMOS_ACCOUNT_ENDPOINT` | `account_endpoint` |
//! | `COSMOS_ACCOUNT_KEY` | `account_key` |
//! | `COSMOS_CONNECTION_STRING` | `connection_string` |
//! | `COSMOS_DATABASE` | `database_name` |
//! | `COSMOS_REGION` | `region` |
//! | `COSMOS_CONNECTION_MODE` | `connection_mode` |
//! | `COSMOS_LIMIT_TO_ENDPOINT` | `limit_to_endpoint` |
//! | `COSMOS_PROXY` | `web_proxy.address` |
//! | `COSMOS_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
//! | `COSMOS_OPEN_TCP_CONNECTION_TIMEOUT_MS` | `open_tcp_connection_timeout_ms` |
//! | `COSMOS_IDLE_TCP_CONNECTION_TIMEOUT_MS` | `idle_tcp_connection_timeout_ms` |
//! | `COSMOS_GATEWAY_MODE_MAX_CONNECTION_LIMIT` | `gateway_mode_max_connection_limit` |
//! | `COSMOS_MAX_TCP_CONNECTIONS_PER_ENDPOINT` | `max_tcp_connections_per_endpoint` |
//! | `COSMOS_MAX_REQUESTS_PER_TCP_CONNECTION` | `max_requests_per_tcp_connection` |

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{CosmosOptions, WebProxy};
use crate::{Error, ErrorContext, Result};

/// Proxy section of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub address: String,
    pub bypass_on_local: bool,
    pub bypass_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ProxyConfig {
    fn into_proxy(self) -> Result<WebProxy> {
        let mut proxy = WebProxy::new(&self.address)?.with_bypass_on_local(self.bypass_on_local);
        for host in self.bypass_list {
            proxy = proxy.with_bypass(host);
        }
        if let Some(username) = self.username {
            proxy = proxy.with_username(username);
        }
        Ok(proxy)
    }
}

/// Serializable mirror of [`CosmosOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_to_endpoint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_proxy: Option<ProxyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_tcp_connection_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_tcp_connection_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_mode_max_connection_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tcp_connections_per_endpoint: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests_per_tcp_connection: Option<u32>,
}

impl OptionsConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(Error::configuration_with_context(
                format!("unsupported configuration format {:?}", other.unwrap_or("")),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("options_config"),
            )),
        }
    }

    /// Read `COSMOS_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            account_endpoint: text("COSMOS_ACCOUNT_ENDPOINT"),
            account_key: text("COSMOS_ACCOUNT_KEY"),
            connection_string: text("COSMOS_CONNECTION_STRING"),
            database_name: text("COSMOS_DATABASE"),
            region: text("COSMOS_REGION"),
            connection_mode: text("COSMOS_CONNECTION_MODE"),
            limit_to_endpoint: parse_var("COSMOS_LIMIT_TO_ENDPOINT", text("COSMOS_LIMIT_TO_ENDPOINT"))?,
            web_proxy: text("COSMOS_PROXY").map(|address| ProxyConfig {
                address,
                ..ProxyConfig::default()
            }),
            request_timeout_ms: parse_var("COSMOS_REQUEST_TIMEOUT_MS", text("COSMOS_REQUEST_TIMEOUT_MS"))?,
            open_tcp_connection_timeout_ms: parse_var(
                "COSMOS_OPEN_TCP_CONNECTION_TIMEOUT_MS",
                text("COSMOS_OPEN_TCP_CONNECTION_TIMEOUT_MS"),
            )?,
            idle_tcp_connection_timeout_ms: parse_var(
                "COSMOS_IDLE_TCP_CONNECTION_TIMEOUT_MS",
                text("COSMOS_IDLE_TCP_CONNECTION_TIMEOUT_MS"),
            )?,
            gateway_mode_max_connection_limit: parse_var(
                "COSMOS_GATEWAY_MODE_MAX_CONNECTION_LIMIT",
                text("COSMOS_GATEWAY_MODE_MAX_CONNECTION_LIMIT"),
            )?,
            max_tcp_connections_per_endpoint: parse_var(
                "COSMOS_MAX_TCP_CONNECTIONS_PER_ENDPOINT",
                text("COSMOS_MAX_TCP_CONNECTIONS_PER_ENDPOINT"),
            )?,
            max_requests_per_tcp_connection: parse_var(
                "COSMOS_MAX_REQUESTS_PER_TCP_CONNECTION",
                text("COSMOS_MAX_REQUESTS_PER_TCP_CONNECTION"),
            )?,
        })
    }

    /// Fields set here replace the ones in `self`.
    pub fn merge(self, overrides: OptionsConfig) -> Self {
        Self {
            account_endpoint: overrides.account_endpoint.or(self.account_endpoint),
            account_key: overrides.account_key.or(self.account_key),
            connection_string: overrides.connection_string.or(self.connection_string),
            database_name: overrides.database_name.or(self.database_name),
            region: overrides.region.or(self.region),
            connection_mode: overrides.connection_mode.or(self.connection_mode),
            limit_to_endpoint: overrides.limit_to_endpoint.or(self.limit_to_endpoint),
            web_proxy: overrides.web_proxy.or(self.web_proxy),
            request_timeout_ms: overrides.request_timeout_ms.or(self.request_timeout_ms),
            open_tcp_connection_timeout_ms: overrides
                .open_tcp_connection_timeout_ms
                .or(self.open_tcp_connection_timeout_ms),
            idle_tcp_connection_timeout_ms: overrides
                .idle_tcp_connection_timeout_ms
                .or(self.idle_tcp_connection_timeout_ms),
            gateway_mode_max_connection_limit: overrides
                .gateway_mode_max_connection_limit
                .or(self.gateway_mode_max_connection_limit),
            max_tcp_connections_per_endpoint: overrides
                .max_tcp_connections_per_endpoint
                .or(self.max_tcp_connections_per_endpoint),
            max_requests_per_tcp_connection: overrides
                .max_requests_per_tcp_connection
                .or(self.max_requests_per_tcp_connection),
        }
    }

    /// Build a descriptor by applying each present field in turn.
    pub fn into_options(self) -> Result<CosmosOptions> {
        let mut options = CosmosOptions::new();
        if let Some(cs) = self.connection_string {
            options = options.with_connection_string(cs)?;
        }
        if let Some(endpoint) = self.account_endpoint {
            options = options.with_account_endpoint(endpoint)?;
        }
        if let Some(key) = self.account_key {
            options = options.with_account_key(key)?;
        }
        if let Some(database) = self.database_name {
            options = options.with_database_name(database);
        }
        if let Some(region) = self.region {
            options = options.with_region(region);
        }
        if let Some(mode) = self.connection_mode {
            options = options.with_connection_mode(mode.as_str())?;
        }
        if let Some(limit) = self.limit_to_endpoint {
            options = options.with_limit_to_endpoint(limit);
        }
        if let Some(proxy) = self.web_proxy {
            options = options.with_web_proxy(proxy.into_proxy()?);
        }
        if let Some(ms) = self.request_timeout_ms {
            options = options.with_request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.open_tcp_connection_timeout_ms {
            options = options.with_open_tcp_connection_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.idle_tcp_connection_timeout_ms {
            options = options.with_idle_tcp_connection_timeout(Duration::from_millis(ms));
        }
        if let Some(limit) = self.gateway_mode_max_connection_limit {
            options = options.with_gateway_mode_max_connection_limit(limit);
        }
        if let Some(limit) = self.max_tcp_connections_per_endpoint {
            options = options.with_max_tcp_connections_per_endpoint(limit);
        }
        if let Some(limit) = self.max_requests_per_tcp_connection {
            options = options.with_max_requests_per_tcp_connection(limit);
        }
        Ok(options)
    }
}

fn parse_var<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid value '{}': {}", raw, e),
                    ErrorContext::new()
                        .with_field_path(key)
                        .with_source("options_config"),
                )
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConnectionMode;
    use std::collections::HashMap;

    #[test]
    fn yaml_round_trips_into_options() {
        let config = OptionsConfig::from_yaml_str(
            r#"
account_endpoint: https://localhost:8081
account_key: c2VjcmV0
database_name: Blogs
connection_mode: direct
request_timeout_ms: 1500
web_proxy:
  address: http://proxy:8080
  bypass_on_local: true
"#,
        )
        .unwrap();

        let options = config.into_options().unwrap();
        assert_eq!(options.account_endpoint(), Some("https://localhost:8081"));
        assert_eq!(options.database_name(), Some("Blogs"));
        assert_eq!(options.connection_mode(), Some(ConnectionMode::Direct));
        assert_eq!(options.request_timeout(), Some(Duration::from_millis(1500)));
        assert!(options.web_proxy().unwrap().bypass_on_local());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            OptionsConfig::from_json_str(r#"{"account_endpiont": "x"}"#),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn lookup_reads_and_validates_variables() {
        let vars: HashMap<&str, &str> = [
            ("COSMOS_CONNECTION_STRING", "AccountEndpoint=https://x;AccountKey=k"),
            ("COSMOS_DATABASE", " Orders "),
            ("COSMOS_MAX_REQUESTS_PER_TCP_CONNECTION", "30"),
            ("COSMOS_REGION", ""),
        ]
        .into_iter()
        .collect();
        let config = OptionsConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.database_name.as_deref(), Some("Orders"));
        assert_eq!(config.max_requests_per_tcp_connection, Some(30));
        assert_eq!(config.region, None);

        let bad = OptionsConfig::from_lookup(|k| {
            (k == "COSMOS_REQUEST_TIMEOUT_MS").then(|| "soon".to_string())
        });
        match bad {
            Err(Error::Configuration { context, .. }) => {
                assert_eq!(context.field_path.as_deref(), Some("COSMOS_REQUEST_TIMEOUT_MS"))
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = OptionsConfig {
            database_name: Some("FromFile".into()),
            region: Some("westus".into()),
            ..OptionsConfig::default()
        };
        let env = OptionsConfig {
            database_name: Some("FromEnv".into()),
            ..OptionsConfig::default()
        };
        let merged = file.merge(env);
        assert_eq!(merged.database_name.as_deref(), Some("FromEnv"));
        assert_eq!(merged.region.as_deref(), Some("westus"));
    }
}
