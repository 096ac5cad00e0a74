//! In-memory world state with whole-state snapshots.

use bytes::Bytes;
use keccak_hash::keccak;
use lfvm_common::constants::EMPTY_CODE_HASH;
use lfvm_common::{Address, Log, H256, U256};
use rustc_hash::{FxHashMap, FxHashSet};

use super::WorldState;

#[derive(Debug, Clone, Default)]
struct Account {
    balance: U256,
    nonce: u64,
    code: Bytes,
    storage: FxHashMap<U256, U256>,
}

/// Everything a snapshot has to capture.
#[derive(Debug, Clone, Default)]
struct State {
    accounts: FxHashMap<Address, Account>,
    /// Pre-transaction values of slots written during the transaction.
    original_storage: FxHashMap<(Address, U256), U256>,
    suicided: FxHashSet<Address>,
    logs: Vec<Log>,
    refund: u64,
    accessed_addresses: FxHashSet<Address>,
    accessed_slots: FxHashSet<(Address, U256)>,
}

#[derive(Debug, Default)]
pub struct InMemoryState {
    state: State,
    snapshots: Vec<State>,
    block_hashes: FxHashMap<u64, H256>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&mut self, address: Address, balance: U256, code: Bytes) {
        let account = self.state.accounts.entry(address).or_default();
        account.balance = balance;
        account.code = code;
    }

    /// Seed a storage slot as if it had been committed before the current
    /// transaction.
    pub fn set_committed_storage(&mut self, address: Address, key: U256, value: U256) {
        self.state
            .accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, value);
    }

    pub fn set_block_hash(&mut self, number: u64, hash: H256) {
        self.block_hashes.insert(number, hash);
    }

    /// Reset per-transaction bookkeeping (refund counter, logs, access
    /// lists, original-slot records, selfdestruct set).
    pub fn begin_transaction(&mut self) {
        self.state.original_storage.clear();
        self.state.logs.clear();
        self.state.refund = 0;
        self.state.accessed_addresses.clear();
        self.state.accessed_slots.clear();
        self.state.suicided.clear();
        self.snapshots.clear();
    }

    pub fn logs(&self) -> &[Log] {
        &self.state.logs
    }
}

impl WorldState for InMemoryState {
    fn get_balance(&self, address: Address) -> U256 {
        self.state
            .accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    fn sub_balance(&mut self, address: Address, amount: U256) {
        let account = self.state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_sub(amount);
    }

    fn get_nonce(&self, address: Address) -> u64 {
        self.state
            .accounts
            .get(&address)
            .map(|a| a.nonce)
            .unwrap_or_default()
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.state.accounts.entry(address).or_default().nonce = nonce;
    }

    fn get_code(&self, address: Address) -> Bytes {
        self.state
            .accounts
            .get(&address)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    fn get_code_size(&self, address: Address) -> usize {
        self.state
            .accounts
            .get(&address)
            .map(|a| a.code.len())
            .unwrap_or_default()
    }

    fn get_code_hash(&self, address: Address) -> H256 {
        match self.state.accounts.get(&address) {
            None => H256::zero(),
            Some(account) if account.code.is_empty() => EMPTY_CODE_HASH,
            Some(account) => keccak(&account.code),
        }
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        self.state.accounts.entry(address).or_default().code = code;
    }

    fn get_state(&self, address: Address, key: U256) -> U256 {
        self.state
            .accounts
            .get(&address)
            .and_then(|a| a.storage.get(&key).copied())
            .unwrap_or_default()
    }

    fn get_committed_state(&self, address: Address, key: U256) -> U256 {
        // A slot untouched this transaction is committed at its current value.
        self.state
            .original_storage
            .get(&(address, key))
            .copied()
            .unwrap_or_else(|| self.get_state(address, key))
    }

    fn set_state(&mut self, address: Address, key: U256, value: U256) {
        let current = self.get_state(address, key);
        self.state
            .original_storage
            .entry((address, key))
            .or_insert(current);
        self.state
            .accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, value);
    }

    fn exist(&self, address: Address) -> bool {
        self.state.accounts.contains_key(&address)
    }

    fn is_empty(&self, address: Address) -> bool {
        match self.state.accounts.get(&address) {
            None => true,
            Some(a) => a.balance.is_zero() && a.nonce == 0 && a.code.is_empty(),
        }
    }

    fn suicide(&mut self, address: Address) -> bool {
        let existed = self.state.accounts.contains_key(&address);
        self.state.suicided.insert(address);
        if let Some(account) = self.state.accounts.get_mut(&address) {
            account.balance = U256::zero();
        }
        existed
    }

    fn has_suicided(&self, address: Address) -> bool {
        self.state.suicided.contains(&address)
    }

    fn add_log(&mut self, log: Log) {
        self.state.logs.push(log);
    }

    fn add_refund(&mut self, gas: u64) {
        self.state.refund += gas;
    }

    fn sub_refund(&mut self, gas: u64) {
        self.state.refund = self.state.refund.saturating_sub(gas);
    }

    fn get_refund(&self) -> u64 {
        self.state.refund
    }

    fn snapshot(&mut self) -> usize {
        self.snapshots.push(self.state.clone());
        self.snapshots.len() - 1
    }

    fn revert_to_snapshot(&mut self, id: usize) {
        self.state = self.snapshots[id].clone();
        self.snapshots.truncate(id);
    }

    fn address_in_access_list(&self, address: Address) -> bool {
        self.state.accessed_addresses.contains(&address)
    }

    fn slot_in_access_list(&self, address: Address, key: U256) -> (bool, bool) {
        (
            self.state.accessed_addresses.contains(&address),
            self.state.accessed_slots.contains(&(address, key)),
        )
    }

    fn add_address_to_access_list(&mut self, address: Address) {
        self.state.accessed_addresses.insert(address);
    }

    fn add_slot_to_access_list(&mut self, address: Address, key: U256) {
        self.state.accessed_slots.insert((address, key));
    }

    fn get_block_hash(&self, number: u64) -> H256 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }
}
