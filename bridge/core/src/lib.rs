// Copyright (c) 2024 The Botho Foundation

//! Core types and logic for the LayerZero NFT bridge.
//!
//! This crate holds the pure parts of bridging an ONFT between EVM
//! networks:
//!
//! - Network -> endpoint id registry and the token catalog
//! - Route resolution, encoded messages and fee quotes
//! - Execution option encoding
//! - The bridge execution state machine
//! - Configuration structures

pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod form;
pub mod networks;
pub mod options;
pub mod request;

pub use catalog::{TokenCatalog, TokenListing};
pub use config::{BridgeConfig, BridgeSettings, NetworkConfig, WalletConfig};
pub use error::{BridgeError, ErrorPhase};
pub use execution::{
    BridgeExecution, ExecutionId, ExecutionStatus, Failure, FailureKind, HistoryEntry,
    HistoryStatus,
};
pub use form::BridgeForm;
pub use networks::{EndpointId, Network, NetworkRegistry};
pub use options::ExecutionOptions;
pub use request::{BridgeRequest, BridgeRoute, EncodedMessage, PreparedBridge, Quote};
