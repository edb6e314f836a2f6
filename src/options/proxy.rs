//! Web proxy used by the gateway connection.

use url::Url;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebProxy {
    address: Url,
    bypass_on_local: bool,
    bypass_list: Vec<String>,
    username: Option<String>,
}

impl WebProxy {
    /// Parse the proxy address. Only `http` and `https` proxies are accepted.
    pub fn new(address: &str) -> Result<Self> {
        let address = Url::parse(address).map_err(|e| {
            Error::invalid_argument("web_proxy", format!("'{}' is not a valid URL: {}", address, e))
        })?;
        if !matches!(address.scheme(), "http" | "https") {
            return Err(Error::invalid_argument(
                "web_proxy",
                format!("unsupported proxy scheme '{}'", address.scheme()),
            ));
        }
        Ok(Self {
            address,
            bypass_on_local: false,
            bypass_list: Vec::new(),
            username: None,
        })
    }

    pub fn with_bypass_on_local(mut self, enable: bool) -> Self {
        self.bypass_on_local = enable;
        self
    }

    /// Add a host that skips the proxy. `*.example.com` matches every subdomain.
    pub fn with_bypass(mut self, host: impl Into<String>) -> Self {
        self.bypass_list.push(host.into().to_ascii_lowercase());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn bypass_on_local(&self) -> bool {
        self.bypass_on_local
    }

    pub fn bypass_list(&self) -> &[String] {
        &self.bypass_list
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether requests to `destination` go direct instead of through the proxy.
    pub fn is_bypassed(&self, destination: &Url) -> bool {
        let Some(host) = destination.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        if self.bypass_on_local
            && (host == "localhost" || host == "127.0.0.1" || host == "[::1]" || !host.contains('.'))
        {
            return true;
        }

        self.bypass_list.iter().any(|entry| match entry.strip_prefix("*.") {
            Some(suffix) => host.ends_with(&format!(".{}", suffix)),
            None => host == *entry,
        })
    }
}
