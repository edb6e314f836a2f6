//! Derived information about a [`CosmosOptions`](super::CosmosOptions) descriptor.
//!
//! The service-provider hash decides whether two configurations can share one
//! service container. It only depends on field values, so descriptors built
//! through different call sequences hash the same.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ConnectionMode, CosmosSettings, WebProxy};
use crate::infrastructure::OptionsExtensionInfo;

/// Label prefix for entries written by `populate_debug_info`.
pub const DEBUG_INFO_PREFIX: &str = "Cosmos:";

/// Deterministic 64-bit hash, stable across processes and builds.
pub trait StableHash {
    fn stable_hash(&self) -> u64;
}

pub(crate) fn digest64(parts: &[&[u8]]) -> u64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

impl StableHash for str {
    fn stable_hash(&self) -> u64 {
        digest64(&[&b"str"[..], self.as_bytes()])
    }
}

impl StableHash for String {
    fn stable_hash(&self) -> u64 {
        self.as_str().stable_hash()
    }
}

impl StableHash for bool {
    fn stable_hash(&self) -> u64 {
        digest64(&[&b"bool"[..], &[u8::from(*self)][..]])
    }
}

impl StableHash for u32 {
    fn stable_hash(&self) -> u64 {
        digest64(&[&b"u32"[..], &self.to_le_bytes()[..]])
    }
}

impl StableHash for Duration {
    fn stable_hash(&self) -> u64 {
        digest64(&[&b"duration"[..], &self.as_nanos().to_le_bytes()[..]])
    }
}

impl StableHash for ConnectionMode {
    fn stable_hash(&self) -> u64 {
        digest64(&[&b"connection_mode"[..], &(*self as i32).to_le_bytes()[..]])
    }
}

impl StableHash for WebProxy {
    fn stable_hash(&self) -> u64 {
        let local: &[u8] = if self.bypass_on_local() { b"1" } else { b"0" };
        let mut parts: Vec<&[u8]> = Vec::new();
        parts.push(b"web_proxy");
        parts.push(self.address().as_str().as_bytes());
        parts.push(local);
        parts.push(self.username().unwrap_or_default().as_bytes());
        parts.extend(self.bypass_list().iter().map(|entry| entry.as_bytes()));
        digest64(&parts)
    }
}

fn hash_of<T: StableHash + ?Sized>(value: Option<&T>) -> u64 {
    value.map_or(0, StableHash::stable_hash)
}

/// Info derived from a Cosmos descriptor. Values are computed once on demand.
#[derive(Debug)]
pub struct ExtensionInfo {
    settings: Arc<CosmosSettings>,
    service_provider_hash: OnceCell<u64>,
    log_fragment: OnceCell<String>,
}

impl ExtensionInfo {
    pub(crate) fn new(settings: Arc<CosmosSettings>) -> Self {
        Self {
            settings,
            service_provider_hash: OnceCell::new(),
            log_fragment: OnceCell::new(),
        }
    }

    fn compute_service_provider_hash(s: &CosmosSettings) -> u64 {
        let mut hash = match s.connection_string.as_deref() {
            Some(cs) if !cs.is_empty() => cs.stable_hash(),
            _ => {
                let endpoint = hash_of(s.account_endpoint.as_deref());
                endpoint.wrapping_mul(397) ^ hash_of(s.account_key.as_deref())
            }
        };
        hash = hash.wrapping_mul(397) ^ hash_of(s.region.as_deref());
        hash = hash.wrapping_mul(3) ^ hash_of(s.connection_mode.as_ref());
        hash = hash.wrapping_mul(3) ^ hash_of(s.limit_to_endpoint.as_ref());
        hash = hash.wrapping_mul(397) ^ hash_of(s.web_proxy.as_ref());
        hash = hash.wrapping_mul(397) ^ hash_of(s.request_timeout.as_ref());
        hash = hash.wrapping_mul(397) ^ hash_of(s.open_tcp_connection_timeout.as_ref());
        hash = hash.wrapping_mul(397) ^ hash_of(s.idle_tcp_connection_timeout.as_ref());
        hash = hash.wrapping_mul(131) ^ hash_of(s.gateway_mode_max_connection_limit.as_ref());
        hash = hash.wrapping_mul(397) ^ hash_of(s.max_tcp_connections_per_endpoint.as_ref());
        hash = hash.wrapping_mul(131) ^ hash_of(s.max_requests_per_tcp_connection.as_ref());
        hash = hash.wrapping_mul(397) ^ hash_of(s.database_name.as_deref());
        debug!(hash, "computed Cosmos service provider hash");
        hash
    }
}

impl OptionsExtensionInfo for ExtensionInfo {
    fn is_database_provider(&self) -> bool {
        true
    }

    fn service_provider_hash_code(&self) -> u64 {
        *self
            .service_provider_hash
            .get_or_init(|| Self::compute_service_provider_hash(&self.settings))
    }

    fn populate_debug_info(&self, debug_info: &mut BTreeMap<String, String>) {
        let s = &self.settings;
        match s.connection_string.as_deref() {
            Some(cs) if !cs.is_empty() => {
                debug_info.insert(
                    format!("{}ConnectionString", DEBUG_INFO_PREFIX),
                    cs.stable_hash().to_string(),
                );
            }
            _ => {
                debug_info.insert(
                    format!("{}AccountEndpoint", DEBUG_INFO_PREFIX),
                    hash_of(s.account_endpoint.as_deref()).to_string(),
                );
                debug_info.insert(
                    format!("{}AccountKey", DEBUG_INFO_PREFIX),
                    hash_of(s.account_key.as_deref()).to_string(),
                );
            }
        }
        debug_info.insert(
            format!("{}Region", DEBUG_INFO_PREFIX),
            hash_of(s.region.as_deref()).to_string(),
        );
    }

    fn log_fragment(&self) -> &str {
        self.log_fragment.get_or_init(|| {
            format!(
                "ServiceEndPoint={} Database={} ",
                self.settings.account_endpoint.as_deref().unwrap_or_default(),
                self.settings.database_name.as_deref().unwrap_or_default(),
            )
        })
    }
}
