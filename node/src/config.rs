//! Node configuration with TOML file support.

use std::path::Path;
use std::time::Duration;

use huc_consensus::EthashConfig;
use huc_core::{CacheConfig, Genesis, TxPoolConfig, VmConfig};
use huc_types::{Address, SyncMode, U256};
use serde::{Deserialize, Serialize};

use crate::gasprice::GpoConfig;
use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration of a full node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Genesis block to create on an empty database. `None` means the main
    /// network genesis.
    #[serde(default)]
    pub genesis: Option<Genesis>,

    #[serde(default = "default_network_id")]
    pub network_id: u64,

    /// "full" or "fast". Validated when the node is built.
    #[serde(default = "default_sync_mode")]
    pub sync_mode: String,

    /// Keep every historical state (archive mode).
    #[serde(default)]
    pub no_pruning: bool,

    /// Percentage of time allowed for serving light clients. Zero disables
    /// the light server peer reservation.
    #[serde(default)]
    pub light_serv: u32,

    /// Peer slots reserved for light clients.
    #[serde(default = "default_light_peers")]
    pub light_peers: usize,

    #[serde(default)]
    pub skip_bc_version_check: bool,

    /// Database cache in MB.
    #[serde(default = "default_database_cache")]
    pub database_cache: usize,

    #[serde(default = "default_database_handles")]
    pub database_handles: usize,

    /// Trie node memory allowance in MB.
    #[serde(default = "default_trie_cache")]
    pub trie_cache: usize,

    #[serde(default = "default_trie_timeout_secs")]
    pub trie_timeout_secs: u64,

    /// Mining reward address. Unset means "first local account".
    #[serde(default)]
    pub coinbase: Option<Address>,

    /// Miner extra data. Empty means the client's default tag.
    #[serde(default)]
    pub extra_data: String,

    /// Default gas price floor, in wei.
    #[serde(default = "default_gas_price")]
    pub gas_price: U256,

    #[serde(default)]
    pub ethash: EthashConfig,

    #[serde(default)]
    pub tx_pool: TxPoolConfig,

    #[serde(default)]
    pub gpo: GpoConfig,

    #[serde(default)]
    pub enable_preimage_recording: bool,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network_id() -> u64 {
    1
}

fn default_sync_mode() -> String {
    SyncMode::Fast.to_string()
}

fn default_light_peers() -> usize {
    20
}

fn default_database_cache() -> usize {
    768
}

fn default_database_handles() -> usize {
    1024
}

fn default_trie_cache() -> usize {
    256
}

fn default_trie_timeout_secs() -> u64 {
    5 * 60
}

fn default_gas_price() -> U256 {
    U256::from(18_000_000_000u64)
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The sync mode a full node runs with. Light sync belongs to a
    /// different node class.
    pub fn full_node_sync_mode(&self) -> Result<SyncMode, NodeError> {
        match self.sync_mode.parse::<SyncMode>() {
            Ok(SyncMode::Light) => Err(NodeError::LightSyncUnsupported),
            Ok(mode) => Ok(mode),
            Err(_) => Err(NodeError::InvalidSyncMode(self.sync_mode.clone())),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            disabled: self.no_pruning,
            trie_node_limit: self.trie_cache,
            trie_time_limit: Duration::from_secs(self.trie_timeout_secs),
        }
    }

    pub fn vm_config(&self) -> VmConfig {
        VmConfig {
            enable_preimage_recording: self.enable_preimage_recording,
            ..VmConfig::default()
        }
    }

    /// Oracle settings, defaulting the fallback price to the node's floor.
    pub fn gpo_config(&self) -> GpoConfig {
        GpoConfig {
            default: Some(self.gpo.default.unwrap_or(self.gas_price)),
            ..self.gpo.clone()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            genesis: None,
            network_id: default_network_id(),
            sync_mode: default_sync_mode(),
            no_pruning: false,
            light_serv: 0,
            light_peers: default_light_peers(),
            skip_bc_version_check: false,
            database_cache: default_database_cache(),
            database_handles: default_database_handles(),
            trie_cache: default_trie_cache(),
            trie_timeout_secs: default_trie_timeout_secs(),
            coinbase: None,
            extra_data: String::new(),
            gas_price: default_gas_price(),
            ethash: EthashConfig::default(),
            tx_pool: TxPoolConfig::default(),
            gpo: GpoConfig::default(),
            enable_preimage_recording: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
