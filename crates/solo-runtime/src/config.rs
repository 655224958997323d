//! # Solo-Machine Configuration
//!
//! Everything the runtime reads from `<home>/config.yaml`.
//!
//! ```yaml
//! store:
//!   backend: file
//!   path: data/solo-machine.db
//! handshake:
//!   transfer_timeout_blocks: 1000
//! chains:
//!   testchain:
//!     chain_id: testchain-1
//!     gateway_addr: http://127.0.0.1:9090
//!     account_prefix: cosmos
//!     gas_adjustment: 1.5
//!     gas_prices: 0.025stake
//!     gas: 300000
//!     keyring_backend: test
//!     key_name: relayer
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{SoloMachineError, SoloResult};
use sm_01_protocol_store::StoreConfig;
use sm_05_handshake::HandshakeConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the configuration inside the home directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Keyring backends the gateway understands.
pub const KEYRING_BACKENDS: [&str; 4] = ["os", "file", "test", "memory"];

/// Complete solo-machine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoloMachineConfig {
    /// Protocol store location and backend.
    pub store: StoreConfig,
    /// Orchestrator parameters shared by all chains.
    pub handshake: HandshakeConfig,
    /// Counterparty chains keyed by chain-link name.
    pub chains: BTreeMap<String, ChainConfig>,
}

/// One counterparty chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id the counterparty reports.
    pub chain_id: String,
    /// Base URL of the chain's gateway endpoint.
    pub gateway_addr: String,
    /// Bech32 prefix of accounts on the chain.
    pub account_prefix: String,
    /// Multiplier applied to simulated gas.
    pub gas_adjustment: f64,
    /// Gas price with denomination, e.g. `0.025stake`.
    pub gas_prices: String,
    /// Gas limit per transaction.
    pub gas: u64,
    /// Keyring holding the fee payer key.
    pub keyring_backend: String,
    /// Name of the fee payer key.
    pub key_name: String,
}

impl ChainConfig {
    /// Create config for testing against a local gateway.
    pub fn for_testing(chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            gateway_addr: "http://127.0.0.1:9090".to_string(),
            account_prefix: "cosmos".to_string(),
            gas_adjustment: 1.5,
            gas_prices: "0.025stake".to_string(),
            gas: 300_000,
            keyring_backend: "test".to_string(),
            key_name: "relayer".to_string(),
        }
    }

    /// Check every field; `name` is the chain-link name used in messages.
    pub fn validate(&self, name: &str) -> SoloResult<()> {
        let invalid = |what: String| SoloMachineError::Configuration {
            message: format!("chain {name}: {what}"),
        };
        if self.chain_id.trim().is_empty() {
            return Err(invalid("chain_id is empty".into()));
        }
        if !(self.gateway_addr.starts_with("http://") || self.gateway_addr.starts_with("https://")) {
            return Err(invalid(format!(
                "gateway_addr {:?} must be an http(s) URL",
                self.gateway_addr
            )));
        }
        if self.account_prefix.is_empty()
            || !self.account_prefix.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err(invalid(format!(
                "account_prefix {:?} must be lowercase letters",
                self.account_prefix
            )));
        }
        if !self.gas_adjustment.is_finite() || self.gas_adjustment < 1.0 {
            return Err(invalid(format!(
                "gas_adjustment {} must be at least 1.0",
                self.gas_adjustment
            )));
        }
        parse_gas_price(&self.gas_prices).map_err(invalid)?;
        if self.gas == 0 {
            return Err(invalid("gas must be positive".into()));
        }
        if !KEYRING_BACKENDS.contains(&self.keyring_backend.as_str()) {
            return Err(invalid(format!(
                "keyring_backend {:?} is not one of {}",
                self.keyring_backend,
                KEYRING_BACKENDS.join(", ")
            )));
        }
        if self.key_name.trim().is_empty() {
            return Err(invalid("key_name is empty".into()));
        }
        Ok(())
    }
}

/// Split `0.025stake` into amount and denomination.
pub fn parse_gas_price(price: &str) -> Result<(f64, &str), String> {
    let split = price
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| format!("gas_prices {price:?} has no denomination"))?;
    let (amount, denom) = price.split_at(split);
    let amount: f64 = amount
        .parse()
        .map_err(|_| format!("gas_prices {price:?} has no valid amount"))?;
    if !denom.chars().all(|c| c.is_ascii_alphanumeric() || c == '/') {
        return Err(format!("gas_prices {price:?} has an invalid denomination"));
    }
    Ok((amount, denom))
}

impl SoloMachineConfig {
    /// Create config for testing (in-memory store, fast polling, one chain).
    pub fn for_testing() -> Self {
        let mut chains = BTreeMap::new();
        chains.insert("testchain".to_string(), ChainConfig::for_testing("testchain-1"));
        Self {
            store: StoreConfig::for_testing(),
            handshake: HandshakeConfig::for_testing(),
            chains,
        }
    }

    /// The configuration `init` writes into a fresh home directory.
    pub fn example() -> Self {
        let mut chains = BTreeMap::new();
        chains.insert("testchain".to_string(), ChainConfig::for_testing("testchain-1"));
        Self {
            store: StoreConfig::default(),
            handshake: HandshakeConfig::default(),
            chains,
        }
    }

    /// Path of the configuration file inside `home`.
    pub fn path_in(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE)
    }

    /// Read and validate `<home>/config.yaml`.
    pub fn load(home: &Path) -> SoloResult<Self> {
        let path = Self::path_in(home);
        let raw = std::fs::read_to_string(&path).map_err(|e| SoloMachineError::Configuration {
            message: format!("cannot read {}: {e} (run `solo-machine init` first)", path.display()),
        })?;
        let config = Self::from_yaml(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without validating.
    pub fn from_yaml(raw: &str) -> SoloResult<Self> {
        serde_yaml::from_str(raw).map_err(|e| SoloMachineError::Configuration {
            message: format!("invalid {CONFIG_FILE}: {e}"),
        })
    }

    /// Write the configuration as YAML to `<home>/config.yaml`.
    pub fn save(&self, home: &Path) -> SoloResult<()> {
        let raw = serde_yaml::to_string(self).map_err(SoloMachineError::serialization)?;
        std::fs::write(Self::path_in(home), raw)
            .map_err(|e| SoloMachineError::storage_io(format!("writing {CONFIG_FILE}: {e}")))
    }

    /// Validate the handshake section and every chain.
    pub fn validate(&self) -> SoloResult<()> {
        self.handshake.validate()?;
        for (name, chain) in &self.chains {
            chain.validate(name)?;
        }
        Ok(())
    }

    /// Configuration of the chain-link `name`.
    pub fn chain(&self, name: &str) -> SoloResult<&ChainConfig> {
        self.chains.get(name).ok_or_else(|| SoloMachineError::Configuration {
            message: format!("no chain named {name:?} in {CONFIG_FILE}"),
        })
    }

    /// Store configuration with a relative path resolved against `home`.
    pub fn store_in(&self, home: &Path) -> StoreConfig {
        let mut store = self.store.clone();
        if store.path.is_relative() {
            store.path = home.join(&store.path);
        }
        store
    }
}
