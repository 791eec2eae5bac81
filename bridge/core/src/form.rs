// Copyright (c) 2024 The Botho Foundation

//! User-editable bridge inputs.
//!
//! Every edit that changes a value bumps the form revision. Anything derived
//! from an older revision (encoded messages, quotes, in-flight executions)
//! must be thrown away by the owner of the form.

use alloy_primitives::Address;

use crate::catalog::TokenCatalog;
use crate::error::BridgeError;
use crate::networks::Network;
use crate::request::{parse_gas_limit, parse_token_id, BridgeRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeForm {
    source: Network,
    destination: Option<Network>,
    token: Option<String>,
    token_id: String,
    gas_limit: String,
    revision: u64,
}

impl Default for BridgeForm {
    fn default() -> Self {
        Self::new(Network::Ethereum, Some(Network::Polygon), 0)
    }
}

impl BridgeForm {
    pub fn new(source: Network, destination: Option<Network>, gas_limit: u128) -> Self {
        Self {
            source,
            destination,
            token: None,
            token_id: String::new(),
            gas_limit: gas_limit.to_string(),
            revision: 0,
        }
    }

    pub fn source(&self) -> Network {
        self.source
    }

    pub fn destination(&self) -> Option<Network> {
        self.destination
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    pub fn gas_limit(&self) -> &str {
        &self.gas_limit
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Change the source network. Clears the selected token.
    pub fn select_source(&mut self, catalog: &TokenCatalog, network: Network) -> bool {
        if self.source == network {
            return false;
        }
        self.source = network;
        self.token = None;
        self.advance_destination(catalog);
        self.touch()
    }

    pub fn select_destination(&mut self, network: Network) -> bool {
        if self.destination == Some(network) {
            return false;
        }
        self.destination = Some(network);
        self.touch()
    }

    /// Select a token (or clear it). Moves the destination to the first
    /// valid choice when the current one is not a listing of the token.
    pub fn select_token(&mut self, catalog: &TokenCatalog, token: Option<&str>) -> bool {
        if self.token.as_deref() == token {
            return false;
        }
        self.token = token.map(str::to_string);
        self.advance_destination(catalog);
        self.touch()
    }

    pub fn set_token_id(&mut self, token_id: &str) -> bool {
        if self.token_id == token_id {
            return false;
        }
        self.token_id = token_id.to_string();
        self.touch()
    }

    pub fn set_gas_limit(&mut self, gas_limit: &str) -> bool {
        if self.gas_limit == gas_limit {
            return false;
        }
        self.gas_limit = gas_limit.to_string();
        self.touch()
    }

    /// Tokens with a listing on the current source network.
    pub fn available_tokens<'a>(&self, catalog: &'a TokenCatalog) -> Vec<&'a str> {
        catalog.tokens_on(self.source)
    }

    /// Destinations offered for the selected token.
    pub fn destination_choices(&self, catalog: &TokenCatalog) -> Vec<Network> {
        match &self.token {
            Some(token) => catalog.destinations_for(token, self.source),
            None => Vec::new(),
        }
    }

    /// Whether the bridge action is enabled.
    pub fn can_bridge(&self, connected: bool) -> bool {
        connected && self.token.is_some() && !self.token_id.trim().is_empty()
    }

    /// Turn the current inputs into a request sent to `recipient`.
    pub fn to_request(&self, recipient: Address) -> Result<BridgeRequest, BridgeError> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| BridgeError::InvalidInput("no token selected".to_string()))?;
        let destination = self
            .destination
            .ok_or_else(|| BridgeError::InvalidInput("no destination selected".to_string()))?;

        Ok(BridgeRequest {
            source: self.source,
            destination,
            token,
            token_id: parse_token_id(&self.token_id)?,
            recipient,
            gas_limit: parse_gas_limit(&self.gas_limit)?,
        })
    }

    fn advance_destination(&mut self, catalog: &TokenCatalog) {
        let choices = self.destination_choices(catalog);
        let valid = self.destination.is_some_and(|d| choices.contains(&d));
        if !valid {
            if let Some(first) = choices.first() {
                self.destination = Some(*first);
            }
        }
    }

    fn touch(&mut self) -> bool {
        self.revision += 1;
        true
    }
}
