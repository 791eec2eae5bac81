// Copyright (c) 2024 The Botho Foundation

//! Bridge request builder.

use lz_nft_bridge_core::{
    BridgeError, BridgeRequest, BridgeRoute, EncodedMessage, NetworkRegistry, PreparedBridge,
    TokenCatalog,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::contract::BridgeContract;
use crate::wallet::WalletSession;

/// A prepared bridge plus the source contract handle that produced it.
pub struct BuiltRequest {
    pub prepared: PreparedBridge,
    pub contract: Arc<dyn BridgeContract>,
}

/// Resolves routes and encodes payload and options.
pub struct RequestBuilder {
    registry: NetworkRegistry,
    catalog: TokenCatalog,
    metadata_uri: String,
    read_timeout: Duration,
}

impl RequestBuilder {
    pub fn new(
        registry: NetworkRegistry,
        catalog: TokenCatalog,
        metadata_uri: impl Into<String>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            catalog,
            metadata_uri: metadata_uri.into(),
            read_timeout,
        }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &TokenCatalog {
        &self.catalog
    }

    /// Validate a request and resolve its route without any external call.
    pub fn route(&self, request: &BridgeRequest) -> Result<BridgeRoute, BridgeError> {
        BridgeRoute::resolve(
            &self.registry,
            &self.catalog,
            &request.token,
            request.source,
            request.destination,
        )
    }

    /// Validate, then have the source contract encode the payload.
    pub async fn build(
        &self,
        session: &WalletSession,
        request: BridgeRequest,
    ) -> Result<BuiltRequest, BridgeError> {
        let route = self.route(&request)?;
        let contract = session
            .provider()
            .contract(request.source, route.source_contract)?;

        let payload = tokio::time::timeout(
            self.read_timeout,
            contract.encode_transfer_payload(
                request.recipient,
                request.token_id,
                self.metadata_uri.clone(),
            ),
        )
        .await
        .map_err(|_| {
            BridgeError::submission(format!(
                "payload encoding timed out after {:?}",
                self.read_timeout
            ))
        })??;

        let options = request.options().to_bytes();
        debug!(
            token = %request.token,
            source = %request.source,
            destination = %request.destination,
            dst_eid = route.dst_eid,
            payload_len = payload.len(),
            options = %request.options().to_hex(),
            "Built bridge request"
        );

        Ok(BuiltRequest {
            prepared: PreparedBridge {
                request,
                route,
                message: EncodedMessage { payload, options },
            },
            contract,
        })
    }
}
