//! The world-state facade consumed by the interpreter.
//!
//! The interpreter never owns accounts or storage; everything it needs from
//! the outside world goes through [`WorldState`]. Hosts implement this
//! against their state database; [`in_memory::InMemoryState`] is a complete
//! reference implementation used by the test suite.

use bytes::Bytes;
use lfvm_common::{Address, Log, H256, U256};

pub mod in_memory;

pub use in_memory::InMemoryState;

/// Capabilities the interpreter requires from the host's state database.
///
/// Storage keys and values are 256-bit words. `snapshot`/`revert_to_snapshot`
/// bracket nested frames; refund bookkeeping is per transaction and applied
/// by the host after execution.
pub trait WorldState {
    fn get_balance(&self, address: Address) -> U256;
    fn add_balance(&mut self, address: Address, amount: U256);
    fn sub_balance(&mut self, address: Address, amount: U256);

    fn get_nonce(&self, address: Address) -> u64;
    fn set_nonce(&mut self, address: Address, nonce: u64);

    fn get_code(&self, address: Address) -> Bytes;
    fn get_code_size(&self, address: Address) -> usize;
    fn get_code_hash(&self, address: Address) -> H256;
    fn set_code(&mut self, address: Address, code: Bytes);

    fn get_state(&self, address: Address, key: U256) -> U256;
    /// The slot value as of the start of the current transaction.
    fn get_committed_state(&self, address: Address, key: U256) -> U256;
    fn set_state(&mut self, address: Address, key: U256, value: U256);

    fn exist(&self, address: Address) -> bool;
    /// Empty per EIP-161: zero balance, zero nonce, no code.
    fn is_empty(&self, address: Address) -> bool;

    fn suicide(&mut self, address: Address) -> bool;
    fn has_suicided(&self, address: Address) -> bool;

    fn add_log(&mut self, log: Log);

    fn add_refund(&mut self, gas: u64);
    fn sub_refund(&mut self, gas: u64);
    fn get_refund(&self) -> u64;

    fn snapshot(&mut self) -> usize;
    fn revert_to_snapshot(&mut self, id: usize);

    // EIP-2929 access lists.
    fn address_in_access_list(&self, address: Address) -> bool;
    /// Returns `(address_present, slot_present)`.
    fn slot_in_access_list(&self, address: Address, key: U256) -> (bool, bool);
    fn add_address_to_access_list(&mut self, address: Address);
    fn add_slot_to_access_list(&mut self, address: Address, key: U256);

    fn get_block_hash(&self, number: u64) -> H256;
}
