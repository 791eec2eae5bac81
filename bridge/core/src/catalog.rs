// Copyright (c) 2024 The Botho Foundation

//! Token catalog: where each bridgeable NFT collection is deployed.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::BridgeError;
use crate::networks::Network;

/// A (network, contract address) pair at which a token is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenListing {
    pub network: Network,
    pub address: Address,
}

/// Token name -> listings. Each token has at most one listing per network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCatalog {
    tokens: BTreeMap<String, Vec<TokenListing>>,
}

impl TokenCatalog {
    /// Build a catalog, rejecting a token listed twice on the same network.
    pub fn new(
        tokens: impl IntoIterator<Item = (String, Vec<TokenListing>)>,
    ) -> Result<Self, BridgeError> {
        let mut catalog = BTreeMap::new();
        for (name, listings) in tokens {
            for (i, listing) in listings.iter().enumerate() {
                if listings[..i].iter().any(|l| l.network == listing.network) {
                    return Err(BridgeError::Config(format!(
                        "token {} listed twice on {}",
                        name, listing.network
                    )));
                }
            }
            if catalog.insert(name.clone(), listings).is_some() {
                return Err(BridgeError::Config(format!("token {} defined twice", name)));
            }
        }
        Ok(Self { tokens: catalog })
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        let mut tokens = BTreeMap::new();
        tokens.insert(
            "DTNS".to_string(),
            vec![
                TokenListing {
                    network: Network::Sepolia,
                    address: address!("A56Dc4c966c6A8b8E6B2e76fA83da715BD692451"),
                },
                TokenListing {
                    network: Network::BitlayerTestnet,
                    address: address!("17838e216b82B6a9934b67fc075cF4e8A8A8997e"),
                },
            ],
        );
        Self { tokens }
    }

    /// All token names, sorted.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    /// Every listing of a token. Unknown tokens have none.
    pub fn listings_for(&self, token: &str) -> &[TokenListing] {
        self.tokens.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Contract address of a token on one network.
    pub fn listing_for(&self, token: &str, network: Network) -> Result<Address, BridgeError> {
        self.listings_for(token)
            .iter()
            .find(|listing| listing.network == network)
            .map(|listing| listing.address)
            .ok_or_else(|| BridgeError::NoListing {
                token: token.to_string(),
                network,
            })
    }

    /// Tokens that can be bridged out of `network`.
    pub fn tokens_on(&self, network: Network) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|(_, listings)| listings.iter().any(|l| l.network == network))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Networks a token can be bridged to from `source`.
    pub fn destinations_for(&self, token: &str, source: Network) -> Vec<Network> {
        self.listings_for(token)
            .iter()
            .map(|listing| listing.network)
            .filter(|network| *network != source)
            .collect()
    }
}
