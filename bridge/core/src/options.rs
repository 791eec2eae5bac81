// Copyright (c) 2024 The Botho Foundation

//! LayerZero v2 message execution options.
//!
//! Options are serialized in the type-3 format:
//!
//! ```text
//! uint16 options_type (= 3)
//! repeated:
//!   uint8  worker_id   (1 = executor)
//!   uint16 option_size (option_type byte + params)
//!   uint8  option_type (1 = lzReceive)
//!   bytes  params
//! ```
//!
//! lzReceive params are `uint128 gas`, followed by `uint128 value` only when
//! the value is non-zero.

use alloy_primitives::Bytes;

const TYPE_3: u16 = 3;
const EXECUTOR_WORKER_ID: u8 = 1;
const OPTION_TYPE_LZRECEIVE: u8 = 1;

/// A single executor option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorOption {
    /// Gas and native value the executor supplies to `lzReceive` on the
    /// destination.
    LzReceive { gas: u128, value: u128 },
}

impl ExecutorOption {
    fn option_type(&self) -> u8 {
        match self {
            ExecutorOption::LzReceive { .. } => OPTION_TYPE_LZRECEIVE,
        }
    }

    fn params(&self) -> Vec<u8> {
        match self {
            ExecutorOption::LzReceive { gas, value } => {
                let mut params = gas.to_be_bytes().to_vec();
                if *value != 0 {
                    params.extend_from_slice(&value.to_be_bytes());
                }
                params
            }
        }
    }
}

/// Builder for an options blob, mirroring `Options.newOptions()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    executor: Vec<ExecutorOption>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying one lzReceive option with `gas` and zero value.
    pub fn lz_receive(gas: u128) -> Self {
        Self::new().add_executor_lz_receive_option(gas, 0)
    }

    pub fn add_executor_lz_receive_option(mut self, gas: u128, value: u128) -> Self {
        self.executor.push(ExecutorOption::LzReceive { gas, value });
        self
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = TYPE_3.to_be_bytes().to_vec();
        for option in &self.executor {
            let params = option.params();
            // option_type byte + params; lzReceive params are at most 32 bytes
            let size = (params.len() + 1) as u16;
            out.push(EXECUTOR_WORKER_ID);
            out.extend_from_slice(&size.to_be_bytes());
            out.push(option.option_type());
            out.extend_from_slice(&params);
        }
        out.into()
    }

    /// 0x-prefixed hex rendering used for transmission.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options() {
        assert_eq!(ExecutionOptions::new().to_hex(), "0x0003");
    }

    #[test]
    fn test_lz_receive_gas_only() {
        let options = ExecutionOptions::lz_receive(200_000);
        assert_eq!(
            options.to_hex(),
            "0x00030100110100000000000000000000000000030d40"
        );
        assert_eq!(options.to_bytes().len(), 2 + 1 + 2 + 1 + 16);
    }

    #[test]
    fn test_lz_receive_zero_gas() {
        assert_eq!(
            ExecutionOptions::lz_receive(0).to_hex(),
            "0x00030100110100000000000000000000000000000000"
        );
    }

    #[test]
    fn test_lz_receive_with_value() {
        let options = ExecutionOptions::new().add_executor_lz_receive_option(65_000, 1);
        let bytes = options.to_bytes();
        assert_eq!(&bytes[..6], &[0x00, 0x03, 0x01, 0x00, 0x21, 0x01]);
        assert_eq!(bytes.len(), 6 + 32);
        assert_eq!(bytes[bytes.len() - 1], 1);
    }
}
