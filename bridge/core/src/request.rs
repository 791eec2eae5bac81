// Copyright (c) 2024 The Botho Foundation

//! Bridge requests, route resolution, encoded messages and fee quotes.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::catalog::TokenCatalog;
use crate::error::BridgeError;
use crate::networks::{EndpointId, Network, NetworkRegistry};
use crate::options::ExecutionOptions;

/// Everything needed to bridge one NFT instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub source: Network,
    pub destination: Network,
    pub token: String,
    pub token_id: U256,
    pub recipient: Address,
    /// Gas supplied to `lzReceive` on the destination.
    pub gas_limit: u128,
}

impl BridgeRequest {
    /// Execution options for this request: one lzReceive option with the
    /// requested gas and no native value.
    pub fn options(&self) -> ExecutionOptions {
        ExecutionOptions::lz_receive(self.gas_limit)
    }
}

/// Parse a decimal token id.
pub fn parse_token_id(input: &str) -> Result<U256, BridgeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BridgeError::InvalidInput("token id is empty".to_string()));
    }
    U256::from_str_radix(input, 10)
        .map_err(|e| BridgeError::InvalidInput(format!("token id {:?}: {}", input, e)))
}

/// Parse a gas limit. An empty field means 0.
pub fn parse_gas_limit(input: &str) -> Result<u128, BridgeError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0);
    }
    input
        .parse::<u128>()
        .map_err(|e| BridgeError::InvalidInput(format!("gas limit {:?}: {}", input, e)))
}

/// Contracts and destination endpoint a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRoute {
    pub source_contract: Address,
    pub destination_contract: Address,
    pub dst_eid: EndpointId,
}

impl BridgeRoute {
    /// Resolve a route. The first violated rule wins:
    /// same network, no source listing, no destination listing, no endpoint.
    pub fn resolve(
        registry: &NetworkRegistry,
        catalog: &TokenCatalog,
        token: &str,
        source: Network,
        destination: Network,
    ) -> Result<Self, BridgeError> {
        if source == destination {
            return Err(BridgeError::InvalidRoute(source));
        }
        let source_contract = catalog.listing_for(token, source)?;
        let destination_contract = catalog.listing_for(token, destination)?;
        let dst_eid = registry.resolve_endpoint(destination)?;

        Ok(Self {
            source_contract,
            destination_contract,
            dst_eid,
        })
    }
}

/// Payload produced by the source contract plus encoded options.
///
/// Kept as a pair so a re-quote never re-derives the options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMessage {
    pub payload: Bytes,
    pub options: Bytes,
}

/// Output of the request builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBridge {
    pub request: BridgeRequest,
    pub route: BridgeRoute,
    pub message: EncodedMessage,
}

/// Fee required to deliver one exact (payload, options, dst_eid) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub native_fee: U256,
    pub lz_token_fee: U256,
    dst_eid: EndpointId,
    payload: Bytes,
    options: Bytes,
}

impl Quote {
    pub fn new(
        dst_eid: EndpointId,
        message: &EncodedMessage,
        native_fee: U256,
        lz_token_fee: U256,
    ) -> Self {
        Self {
            native_fee,
            lz_token_fee,
            dst_eid,
            payload: message.payload.clone(),
            options: message.options.clone(),
        }
    }

    pub fn dst_eid(&self) -> EndpointId {
        self.dst_eid
    }

    pub fn covers(&self, dst_eid: EndpointId, message: &EncodedMessage) -> bool {
        self.dst_eid == dst_eid
            && self.payload == message.payload
            && self.options == message.options
    }

    /// Reject submission of a message this quote was not produced for.
    pub fn ensure_covers(
        &self,
        dst_eid: EndpointId,
        message: &EncodedMessage,
    ) -> Result<(), BridgeError> {
        if self.covers(dst_eid, message) {
            Ok(())
        } else {
            Err(BridgeError::StaleQuote)
        }
    }
}
