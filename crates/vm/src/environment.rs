//! Block and transaction context supplied by the host.

use lfvm_common::{Address, Fork, U256};

/// Everything the block-context and tx-context opcodes read, plus the fork
/// the pricing rules are keyed off.
#[derive(Debug, Clone)]
pub struct Environment {
    pub origin: Address,
    pub gas_price: U256,
    pub coinbase: Address,
    pub timestamp: U256,
    pub block_number: U256,
    pub difficulty: U256,
    pub block_gas_limit: u64,
    pub chain_id: U256,
    pub base_fee: U256,
    pub fork: Fork,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            origin: Address::zero(),
            gas_price: U256::zero(),
            coinbase: Address::zero(),
            timestamp: U256::zero(),
            block_number: U256::zero(),
            difficulty: U256::zero(),
            block_gas_limit: 30_000_000,
            chain_id: U256::zero(),
            base_fee: U256::zero(),
            fork: Fork::London,
        }
    }
}

impl Environment {
    pub fn default_from_address(origin: Address) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    pub fn with_fork(fork: Fork) -> Self {
        Self {
            fork,
            ..Default::default()
        }
    }
}
