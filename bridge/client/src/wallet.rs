// Copyright (c) 2024 The Botho Foundation

//! Wallet provider capability and the connected wallet session.

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use futures::future::BoxFuture;
use lz_nft_bridge_core::{BridgeConfig, BridgeError, EndpointId, Network};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::contract::{AlloyBridgeContract, BridgeContract};

/// Environment variable holding the hex private key when no key file is
/// configured.
pub const PRIVATE_KEY_ENV: &str = "NFT_BRIDGE_PRIVATE_KEY";

/// External wallet capability: accounts, signature approval and
/// signer-bound contract access.
pub trait WalletProvider: Send + Sync {
    fn request_accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, BridgeError>>;

    /// Ask the user to approve a signature. User-paced; no timeout.
    fn approve(&self, request: &SigningRequest) -> BoxFuture<'_, bool>;

    /// Contract handle on `network` whose writes are signed by this wallet.
    fn contract(
        &self,
        network: Network,
        address: Address,
    ) -> Result<Arc<dyn BridgeContract>, BridgeError>;
}

/// What the signer is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub network: Network,
    pub contract: Address,
    pub from: Address,
    pub dst_eid: EndpointId,
    pub token_id: U256,
    pub native_fee: U256,
}

/// Asks the user to approve a signature.
pub trait SigningPrompt: Send + Sync {
    fn approve(&self, request: &SigningRequest) -> BoxFuture<'_, bool>;
}

/// Approves everything.
pub struct AutoApprove;

impl SigningPrompt for AutoApprove {
    fn approve(&self, _request: &SigningRequest) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

/// Asks on the terminal.
pub struct TerminalPrompt;

impl SigningPrompt for TerminalPrompt {
    fn approve(&self, request: &SigningRequest) -> BoxFuture<'_, bool> {
        let question = format!(
            "Sign bridgeONFT on {} (contract {}, token {}, dst eid {}) paying {} wei? [y/N] ",
            request.network, request.contract, request.token_id, request.dst_eid, request.native_fee
        );
        Box::pin(async move {
            let answer = tokio::task::spawn_blocking(move || {
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(question.as_bytes());
                let _ = stdout.flush();
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line).map(|_| line)
            })
            .await;
            matches!(answer, Ok(Ok(line)) if matches!(line.trim(), "y" | "Y" | "yes"))
        })
    }
}

/// Wallet backed by a local private key and per-network HTTP RPC.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    rpc_urls: BTreeMap<Network, Url>,
    prompt: Arc<dyn SigningPrompt>,
    send_timeout: Duration,
    poll_interval: Duration,
}

impl LocalWallet {
    pub fn new(
        signer: PrivateKeySigner,
        rpc_urls: BTreeMap<Network, Url>,
        prompt: Arc<dyn SigningPrompt>,
        send_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            signer,
            rpc_urls,
            prompt,
            send_timeout,
            poll_interval,
        }
    }

    /// Build from configuration, reading the key from the configured file or
    /// from `NFT_BRIDGE_PRIVATE_KEY`.
    pub fn from_config(
        config: &BridgeConfig,
        prompt: Arc<dyn SigningPrompt>,
    ) -> Result<Self, BridgeError> {
        let key = match &config.wallet.private_key_file {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|e| BridgeError::Wallet(format!("Failed to read key file: {}", e)))?,
            None => std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
                BridgeError::Wallet(format!(
                    "no private_key_file configured and {} is not set",
                    PRIVATE_KEY_ENV
                ))
            })?,
        };
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| BridgeError::Wallet(format!("Invalid private key: {}", e)))?;

        let mut rpc_urls = BTreeMap::new();
        for network in Network::ALL {
            if let Ok(url) = config.rpc_url(network) {
                let url = Url::parse(url).map_err(|e| {
                    BridgeError::Config(format!("invalid rpc_url for {}: {}", network, e))
                })?;
                rpc_urls.insert(network, url);
            }
        }

        Ok(Self::new(
            signer,
            rpc_urls,
            prompt,
            config.bridge.quote_timeout(),
            config.bridge.receipt_poll_interval(),
        ))
    }
}

impl WalletProvider for LocalWallet {
    fn request_accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, BridgeError>> {
        let account = self.signer.address();
        Box::pin(async move { Ok(vec![account]) })
    }

    fn approve(&self, request: &SigningRequest) -> BoxFuture<'_, bool> {
        self.prompt.approve(request)
    }

    fn contract(
        &self,
        network: Network,
        address: Address,
    ) -> Result<Arc<dyn BridgeContract>, BridgeError> {
        let rpc_url = self
            .rpc_urls
            .get(&network)
            .cloned()
            .ok_or_else(|| BridgeError::Config(format!("no rpc_url configured for {}", network)))?;

        Ok(Arc::new(AlloyBridgeContract::new(
            network,
            address,
            rpc_url,
            self.signer.clone(),
            self.send_timeout,
            self.poll_interval,
        )))
    }
}

/// A connected wallet: the account plus the provider that signs for it.
#[derive(Clone)]
pub struct WalletSession {
    account: Address,
    provider: Arc<dyn WalletProvider>,
}

impl WalletSession {
    /// Request accounts and bind the session to the first one.
    pub async fn connect(provider: Arc<dyn WalletProvider>) -> Result<Self, BridgeError> {
        let accounts = provider.request_accounts().await?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| BridgeError::Wallet("wallet returned no accounts".to_string()))?;

        info!(account = %account, "Wallet connected");
        Ok(Self { account, provider })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first dev account.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn config_with_key(key_file: &std::path::Path) -> BridgeConfig {
        BridgeConfig::from_toml(&format!(
            r#"
[wallet]
private_key_file = "{}"

[networks.sepolia]
rpc_url = "http://localhost:8545"
"#,
            key_file.display()
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_session_uses_first_account() {
        let dir = tempfile::TempDir::new().unwrap();
        let key_file = dir.path().join("bridge.key");
        std::fs::write(&key_file, format!("{}\n", DEV_KEY)).unwrap();

        let wallet = LocalWallet::from_config(&config_with_key(&key_file), Arc::new(AutoApprove))
            .unwrap();
        let session = WalletSession::connect(Arc::new(wallet)).await.unwrap();
        assert_eq!(session.account(), DEV_ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_contract_requires_rpc_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let key_file = dir.path().join("bridge.key");
        std::fs::write(&key_file, DEV_KEY).unwrap();

        let wallet = LocalWallet::from_config(&config_with_key(&key_file), Arc::new(AutoApprove))
            .unwrap();
        assert!(wallet.contract(Network::Sepolia, Address::ZERO).is_ok());
        assert!(matches!(
            wallet.contract(Network::Polygon, Address::ZERO),
            Err(BridgeError::Config(_))
        ));
    }

    struct Decline;

    impl SigningPrompt for Decline {
        fn approve(&self, _request: &SigningRequest) -> BoxFuture<'_, bool> {
            Box::pin(async { false })
        }
    }

    #[tokio::test]
    async fn test_approval_uses_prompt() {
        let dir = tempfile::TempDir::new().unwrap();
        let key_file = dir.path().join("bridge.key");
        std::fs::write(&key_file, DEV_KEY).unwrap();
        let config = config_with_key(&key_file);

        let request = SigningRequest {
            network: Network::Sepolia,
            contract: Address::ZERO,
            from: DEV_ADDRESS.parse().unwrap(),
            dst_eid: 40320,
            token_id: U256::from(7),
            native_fee: U256::from(1_000),
        };

        let declining = LocalWallet::from_config(&config, Arc::new(Decline)).unwrap();
        assert!(!declining.approve(&request).await);

        let approving = LocalWallet::from_config(&config, Arc::new(AutoApprove)).unwrap();
        assert!(approving.approve(&request).await);
    }

    #[test]
    fn test_missing_key_file() {
        let config = config_with_key(std::path::Path::new("/nonexistent/bridge.key"));
        assert!(matches!(
            LocalWallet::from_config(&config, Arc::new(AutoApprove)),
            Err(BridgeError::Wallet(_))
        ));
    }
}
