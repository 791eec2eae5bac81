// Copyright (c) 2024 The Botho Foundation

//! LayerZero NFT bridge client.
//!
//! Connects a wallet, builds and quotes bridge requests against the source
//! ONFT contract, and drives submission through to inclusion.

pub mod builder;
pub mod contract;
pub mod executor;
pub mod quoter;
pub mod wallet;

pub use builder::{BuiltRequest, RequestBuilder};
pub use contract::{AlloyBridgeContract, BridgeContract, Inclusion, MessagingFee};
pub use executor::BridgeExecutor;
pub use quoter::FeeQuoter;
pub use wallet::{
    AutoApprove, LocalWallet, SigningPrompt, SigningRequest, TerminalPrompt, WalletProvider,
    WalletSession,
};
