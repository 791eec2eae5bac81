// Copyright (c) 2024 The Botho Foundation

//! Supported networks and their LayerZero endpoint ids.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::BridgeError;

/// LayerZero endpoint identifier of a network.
pub type EndpointId = u32;

/// Networks the bridge knows about.
///
/// Having a variant does not imply an endpoint id: `Bnb` carries listings in
/// some catalogs but has no endpoint in the default deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Ethereum,
    Polygon,
    Bnb,
    Sepolia,
    BitlayerTestnet,
    Amoy,
    Base,
}

impl Network {
    /// All networks, in selector order.
    pub const ALL: [Network; 7] = [
        Network::Ethereum,
        Network::Polygon,
        Network::Bnb,
        Network::Sepolia,
        Network::BitlayerTestnet,
        Network::Amoy,
        Network::Base,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Polygon => "polygon",
            Network::Bnb => "bnb",
            Network::Sepolia => "sepolia",
            Network::BitlayerTestnet => "bitlayer_testnet",
            Network::Amoy => "amoy",
            Network::Base => "base",
        }
    }

    /// Endpoint id in the default deployment table.
    pub fn default_endpoint_id(&self) -> Option<EndpointId> {
        match self {
            Network::Ethereum => Some(30101),
            Network::Sepolia => Some(40161),
            Network::Polygon => Some(30109),
            Network::Amoy => Some(40267),
            Network::Base => Some(30184),
            Network::BitlayerTestnet => Some(40320),
            Network::Bnb => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Network::ALL
            .into_iter()
            .find(|network| network.as_str() == name)
            .ok_or_else(|| BridgeError::UnknownNetwork(s.to_string()))
    }
}

/// Network -> endpoint id table for one deployment.
///
/// Immutable once built. Lookups fail closed: a network without an entry is
/// `UnknownNetwork`, never a default id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    endpoints: BTreeMap<Network, EndpointId>,
}

impl NetworkRegistry {
    /// Build a registry from the default table plus per-network overrides.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (Network, EndpointId)>) -> Self {
        let mut registry = Self::default();
        registry.endpoints.extend(overrides);
        registry
    }

    /// Resolve the messaging endpoint id of a network.
    pub fn resolve_endpoint(&self, network: Network) -> Result<EndpointId, BridgeError> {
        self.endpoints
            .get(&network)
            .copied()
            .ok_or_else(|| BridgeError::UnknownNetwork(network.to_string()))
    }

    /// Resolve a network given by name.
    pub fn resolve_endpoint_by_name(&self, name: &str) -> Result<EndpointId, BridgeError> {
        self.resolve_endpoint(name.parse()?)
    }

    /// Networks with an endpoint id, with their ids.
    pub fn endpoints(&self) -> impl Iterator<Item = (Network, EndpointId)> + '_ {
        self.endpoints.iter().map(|(network, eid)| (*network, *eid))
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        let endpoints = Network::ALL
            .into_iter()
            .filter_map(|network| network.default_endpoint_id().map(|eid| (network, eid)))
            .collect();
        Self { endpoints }
    }
}
