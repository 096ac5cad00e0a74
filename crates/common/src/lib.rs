//! Shared primitives for the long-form EVM.
//!
//! Everything here is consumed by the `lfvm` crate and by embedders: the
//! 256-bit word and hash types, the fork schedule, log records, and the
//! contract-address derivation used by the create opcodes.

pub mod constants;
pub mod evm;
pub mod types;

pub use types::{Address, Fork, Log, H256, U256, U512};
