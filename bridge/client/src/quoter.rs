// Copyright (c) 2024 The Botho Foundation

//! Fee quoter.

use lz_nft_bridge_core::{BridgeError, EncodedMessage, EndpointId, Quote};
use std::time::Duration;
use tracing::debug;

use crate::contract::BridgeContract;

/// Calls the source contract's quoting entry point with a bounded wait.
///
/// Never retries and never substitutes a default fee.
pub struct FeeQuoter {
    timeout: Duration,
}

impl FeeQuoter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn quote(
        &self,
        contract: &dyn BridgeContract,
        dst_eid: EndpointId,
        message: &EncodedMessage,
    ) -> Result<Quote, BridgeError> {
        let fee = tokio::time::timeout(
            self.timeout,
            contract.quote(dst_eid, message.payload.clone(), message.options.clone()),
        )
        .await
        .map_err(|_| {
            BridgeError::QuoteUnavailable(format!("no quote within {:?}", self.timeout))
        })?
        .map_err(|e| match e {
            BridgeError::QuoteUnavailable(_) => e,
            other => BridgeError::QuoteUnavailable(other.to_string()),
        })?;

        debug!(
            dst_eid,
            native_fee = %fee.native_fee,
            lz_token_fee = %fee.lz_token_fee,
            "Quoted bridge fee"
        );
        Ok(Quote::new(dst_eid, message, fee.native_fee, fee.lz_token_fee))
    }
}
