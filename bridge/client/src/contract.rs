// Copyright (c) 2024 The Botho Foundation

//! Source-chain ONFT bridge contract.

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use futures::future::BoxFuture;
use lz_nft_bridge_core::{BridgeError, EndpointId, Network};
use std::time::Duration;
use tracing::{debug, info, warn};

sol! {
    /// ONFT bridge entry points used by the client.
    #[sol(rpc)]
    contract ONFTBridge {
        struct MessagingFee {
            uint256 nativeFee;
            uint256 lzTokenFee;
        }

        function encodeBridgeToken(address recipient, uint256 tokenId, string calldata tokenURI)
            external view returns (bytes memory payload);

        function quoteBridge(uint32 dstEid, bytes calldata payload, bytes calldata options)
            external view returns (MessagingFee memory fee);

        function bridgeONFT(uint32 dstEid, uint256 tokenId, bytes calldata options)
            external payable;
    }
}

/// Fee returned by the quoting entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagingFee {
    pub native_fee: U256,
    pub lz_token_fee: U256,
}

/// Result of waiting for a transaction to be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusion {
    pub success: bool,
    pub block_number: Option<u64>,
}

/// The source contract as seen by the bridge flow.
///
/// Handles are bound to one network, one contract address and the wallet
/// signer; `bridge` is the only method that signs. Approval is obtained
/// through the wallet before `bridge` is called, never inside it.
pub trait BridgeContract: Send + Sync {
    fn address(&self) -> Address;

    fn encode_transfer_payload(
        &self,
        recipient: Address,
        token_id: U256,
        metadata_uri: String,
    ) -> BoxFuture<'_, Result<Bytes, BridgeError>>;

    fn quote(
        &self,
        dst_eid: EndpointId,
        payload: Bytes,
        options: Bytes,
    ) -> BoxFuture<'_, Result<MessagingFee, BridgeError>>;

    /// Sign and broadcast `bridgeONFT` with `native_fee` attached as value,
    /// without prompting. Returns the transaction hash once broadcast.
    fn bridge(
        &self,
        dst_eid: EndpointId,
        token_id: U256,
        options: Bytes,
        native_fee: U256,
    ) -> BoxFuture<'_, Result<B256, BridgeError>>;

    /// Resolve once the transaction is included. No internal timeout.
    fn wait_for_inclusion(&self, tx_hash: B256) -> BoxFuture<'_, Result<Inclusion, BridgeError>>;
}

/// Map a provider error raised while sending to the error taxonomy.
pub fn classify_send_error(message: &str) -> BridgeError {
    let lower = message.to_lowercase();
    if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("rejected by user")
    {
        BridgeError::UserRejected
    } else {
        BridgeError::submission(message)
    }
}

/// `BridgeContract` over an alloy HTTP provider and a local signer.
pub struct AlloyBridgeContract {
    network: Network,
    address: Address,
    rpc_url: Url,
    signer: PrivateKeySigner,
    send_timeout: Duration,
    poll_interval: Duration,
}

impl AlloyBridgeContract {
    pub fn new(
        network: Network,
        address: Address,
        rpc_url: Url,
        signer: PrivateKeySigner,
        send_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            network,
            address,
            rpc_url,
            signer,
            send_timeout,
            poll_interval,
        }
    }

    async fn encode(
        &self,
        recipient: Address,
        token_id: U256,
        metadata_uri: String,
    ) -> Result<Bytes, BridgeError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = ONFTBridge::new(self.address, &provider);

        let encoded = contract
            .encodeBridgeToken(recipient, token_id, metadata_uri)
            .call()
            .await
            .map_err(|e| BridgeError::submission(format!("encodeBridgeToken failed: {}", e)))?;

        Ok(encoded.payload)
    }

    async fn quote_fee(
        &self,
        dst_eid: EndpointId,
        payload: Bytes,
        options: Bytes,
    ) -> Result<MessagingFee, BridgeError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = ONFTBridge::new(self.address, &provider);

        let quoted = contract
            .quoteBridge(dst_eid, payload, options)
            .call()
            .await
            .map_err(|e| BridgeError::QuoteUnavailable(format!("quoteBridge failed: {}", e)))?;

        Ok(MessagingFee {
            native_fee: quoted.fee.nativeFee,
            lz_token_fee: quoted.fee.lzTokenFee,
        })
    }

    async fn send_bridge(
        &self,
        dst_eid: EndpointId,
        token_id: U256,
        options: Bytes,
        native_fee: U256,
    ) -> Result<B256, BridgeError> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());
        let contract = ONFTBridge::new(self.address, &provider);

        let call = contract
            .bridgeONFT(dst_eid, token_id, options)
            .value(native_fee);

        let pending = tokio::time::timeout(self.send_timeout, call.send())
            .await
            .map_err(|_| {
                BridgeError::submission(format!(
                    "bridgeONFT not accepted within {:?}",
                    self.send_timeout
                ))
            })?
            .map_err(|e| classify_send_error(&e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        info!(
            network = %self.network,
            tx_hash = %tx_hash,
            dst_eid,
            "bridgeONFT sent, waiting for inclusion"
        );
        Ok(tx_hash)
    }

    async fn poll_receipt(&self, tx_hash: B256) -> Result<Inclusion, BridgeError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        loop {
            match provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(Inclusion {
                        success: receipt.status(),
                        block_number: receipt.block_number(),
                    });
                }
                Ok(None) => debug!(tx_hash = %tx_hash, "Receipt not available yet"),
                Err(e) => warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl BridgeContract for AlloyBridgeContract {
    fn address(&self) -> Address {
        self.address
    }

    fn encode_transfer_payload(
        &self,
        recipient: Address,
        token_id: U256,
        metadata_uri: String,
    ) -> BoxFuture<'_, Result<Bytes, BridgeError>> {
        Box::pin(self.encode(recipient, token_id, metadata_uri))
    }

    fn quote(
        &self,
        dst_eid: EndpointId,
        payload: Bytes,
        options: Bytes,
    ) -> BoxFuture<'_, Result<MessagingFee, BridgeError>> {
        Box::pin(self.quote_fee(dst_eid, payload, options))
    }

    fn bridge(
        &self,
        dst_eid: EndpointId,
        token_id: U256,
        options: Bytes,
        native_fee: U256,
    ) -> BoxFuture<'_, Result<B256, BridgeError>> {
        Box::pin(self.send_bridge(dst_eid, token_id, options, native_fee))
    }

    fn wait_for_inclusion(&self, tx_hash: B256) -> BoxFuture<'_, Result<Inclusion, BridgeError>> {
        Box::pin(self.poll_receipt(tx_hash))
    }
}
