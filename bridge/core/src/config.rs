// Copyright (c) 2024 The Botho Foundation

//! Bridge configuration types.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::catalog::{TokenCatalog, TokenListing};
use crate::error::BridgeError;
use crate::networks::{EndpointId, Network, NetworkRegistry};

/// Main bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Signing wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Per-network RPC endpoints and endpoint id overrides
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,

    /// Token catalog; empty means the built-in catalog
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,

    /// Bridge-specific settings
    #[serde(default)]
    pub bridge: BridgeSettings,
}

/// Signing wallet configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to a file holding the hex private key
    pub private_key_file: Option<String>,
}

/// Connection settings for one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTP(S) JSON-RPC URL
    pub rpc_url: String,

    /// Endpoint id override for this deployment
    pub endpoint_id: Option<EndpointId>,
}

/// One token and where it is deployed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub listings: Vec<ListingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub network: Network,
    pub address: String,
}

/// Bridge-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Metadata pointer encoded into the transfer payload
    #[serde(default = "default_metadata_uri")]
    pub metadata_uri: String,

    /// Upper bound on a fee quote call, in seconds
    #[serde(default = "default_quote_timeout")]
    pub quote_timeout_secs: u64,

    /// Upper bound on waiting for inclusion, in seconds
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval, in milliseconds
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,

    /// Gas limit the form starts with
    #[serde(default)]
    pub default_gas_limit: u64,

    /// Source network the form starts with
    #[serde(default = "default_source")]
    pub default_source: Network,

    /// Destination network the form starts with
    #[serde(default = "default_destination")]
    pub default_destination: Network,
}

fn default_metadata_uri() -> String {
    "ipfs://QmfHc16wyUL6c9tGdJWUHuzUraup6CfYmTK5SgWW3ywCsX".to_string()
}

fn default_quote_timeout() -> u64 {
    15
}

fn default_receipt_timeout() -> u64 {
    300
}

fn default_receipt_poll_interval() -> u64 {
    2_000
}

fn default_source() -> Network {
    Network::Ethereum
}

fn default_destination() -> Network {
    Network::Polygon
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            metadata_uri: default_metadata_uri(),
            quote_timeout_secs: default_quote_timeout(),
            receipt_timeout_secs: default_receipt_timeout(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
            default_gas_limit: 0,
            default_source: default_source(),
            default_destination: default_destination(),
        }
    }
}

impl BridgeSettings {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, BridgeError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject network sections that do not name a known network or whose
    /// RPC URL is not HTTP(S).
    pub fn validate(&self) -> Result<(), BridgeError> {
        for (name, network) in &self.networks {
            name.parse::<Network>()
                .map_err(|e| BridgeError::Config(format!("[networks.{}]: {}", name, e)))?;

            let rpc_url = network.rpc_url.trim();
            if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
                return Err(BridgeError::Config(format!(
                    "[networks.{}]: rpc_url must be http(s), got {}",
                    name, network.rpc_url
                )));
            }
        }
        Ok(())
    }

    fn network_config(&self, network: Network) -> Option<&NetworkConfig> {
        self.networks
            .iter()
            .find(|(name, _)| name.parse::<Network>().ok() == Some(network))
            .map(|(_, cfg)| cfg)
    }

    /// Endpoint table: defaults plus configured overrides.
    pub fn registry(&self) -> NetworkRegistry {
        NetworkRegistry::with_overrides(self.networks.iter().filter_map(|(name, cfg)| {
            let network = name.parse::<Network>().ok()?;
            cfg.endpoint_id.map(|eid| (network, eid))
        }))
    }

    /// Token catalog from the `tokens` section, or the built-in one.
    pub fn catalog(&self) -> Result<TokenCatalog, BridgeError> {
        if self.tokens.is_empty() {
            return Ok(TokenCatalog::builtin());
        }

        let mut tokens = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            let mut listings = Vec::with_capacity(token.listings.len());
            for listing in &token.listings {
                let address = listing.address.parse::<Address>().map_err(|e| {
                    BridgeError::Config(format!(
                        "token {} on {}: invalid address {}: {}",
                        token.name, listing.network, listing.address, e
                    ))
                })?;
                listings.push(TokenListing {
                    network: listing.network,
                    address,
                });
            }
            tokens.push((token.name.clone(), listings));
        }
        TokenCatalog::new(tokens)
    }

    /// RPC URL of a network.
    pub fn rpc_url(&self, network: Network) -> Result<&str, BridgeError> {
        self.network_config(network)
            .map(|cfg| cfg.rpc_url.as_str())
            .ok_or_else(|| BridgeError::Config(format!("no rpc_url configured for {}", network)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[wallet]
private_key_file = "bridge.key"

[networks.sepolia]
rpc_url = "https://rpc.sepolia.org"

[networks.bnb]
rpc_url = "https://bsc-dataseed.binance.org"
endpoint_id = 30102

[[tokens]]
name = "Azuki"
listings = [
    { network = "ethereum", address = "0xED5AF388653567Af2F388E6224dC7C4b3241C544" },
    { network = "bnb", address = "0x1111111111111111111111111111111111111111" },
]

[bridge]
quote_timeout_secs = 5
default_gas_limit = 200000
"#;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.bridge.quote_timeout(), Duration::from_secs(15));
        assert_eq!(config.bridge.default_source, Network::Ethereum);
        assert_eq!(config.bridge.default_destination, Network::Polygon);
        assert_eq!(config.catalog().unwrap(), TokenCatalog::builtin());
        assert_eq!(config.registry(), NetworkRegistry::default());
    }

    #[test]
    fn test_parse_sample() {
        let config = BridgeConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.wallet.private_key_file.as_deref(), Some("bridge.key"));
        assert_eq!(config.bridge.quote_timeout_secs, 5);
        assert_eq!(config.bridge.receipt_timeout_secs, 300);
        assert_eq!(config.bridge.default_gas_limit, 200_000);
        assert_eq!(
            config.rpc_url(Network::Sepolia).unwrap(),
            "https://rpc.sepolia.org"
        );
        assert!(config.rpc_url(Network::Base).is_err());

        let registry = config.registry();
        assert_eq!(registry.resolve_endpoint(Network::Bnb).unwrap(), 30102);

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.tokens().collect::<Vec<_>>(), vec!["Azuki"]);
        assert!(catalog.listing_for("Azuki", Network::Bnb).is_ok());
    }

    #[test]
    fn test_invalid_listing_address() {
        let config = BridgeConfig::from_toml(
            r#"
[[tokens]]
name = "BAYC"
listings = [{ network = "ethereum", address = "0xBAYC_eth_address" }]
"#,
        )
        .unwrap();
        assert!(matches!(config.catalog(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_unknown_network_in_config() {
        let result = BridgeConfig::from_toml(
            r#"
[networks.arbitrum]
rpc_url = "https://arb1.arbitrum.io/rpc"
"#,
        );
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_non_http_rpc_url_rejected() {
        let result = BridgeConfig::from_toml(
            r#"
[networks.sepolia]
rpc_url = "wss://ethereum-sepolia-rpc.publicnode.com"
"#,
        );
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = BridgeConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.networks.len(), 2);

        assert!(BridgeConfig::from_file("/nonexistent/bridge.toml").is_err());
    }
}
