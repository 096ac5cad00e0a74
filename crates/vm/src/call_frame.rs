//! The per-invocation execution context.

use std::sync::Arc;

use bytes::Bytes;
use lfvm_common::{Address, U256};
use sha3::Keccak256;

use crate::errors::{Status, VmError};
use crate::gas_cost::{COLD_ACCOUNT_ACCESS_COST, COLD_SLOAD_COST, WARM_STORAGE_READ_COST};
use crate::instruction::Code;
use crate::memory::Memory;
use crate::stack::PooledStack;
use crate::vm::Evm;

/// The contract a frame executes: its storage context, caller, endowment,
/// remaining gas, and (untranslated) code.
#[derive(Debug, Clone)]
pub struct Contract {
    pub address: Address,
    pub caller: Address,
    pub value: U256,
    pub gas: u64,
    pub code: Bytes,
}

impl Contract {
    pub fn new(address: Address, caller: Address, value: U256, gas: u64, code: Bytes) -> Self {
        Self {
            address,
            caller,
            value,
            gas,
            code,
        }
    }
}

/// One invocation of the interpreter. Created with an empty stack and
/// memory, `pc = 0` and `status = Running`; the dispatch loop drives it to a
/// terminal status. Nested calls reach the enclosing EVM through `evm`.
pub struct CallFrame<'f, 's> {
    pub code: Arc<Code>,
    pub data: Bytes,
    pub stack: PooledStack,
    pub memory: Memory,
    pub contract: Contract,
    pub read_only: bool,
    pub pc: usize,
    pub status: Status,
    pub err: Option<VmError>,
    /// Memory window surfaced by `RETURN`/`REVERT`.
    pub result_offset: u64,
    pub result_size: u64,
    /// Output of the most recent nested call.
    pub return_data: Bytes,
    pub hasher: Keccak256,
    pub is_berlin: bool,
    pub is_london: bool,
    pub evm: &'f mut Evm<'s>,
}

impl CallFrame<'_, '_> {
    /// Deduct gas, leaving the counter untouched when it cannot cover the
    /// charge.
    #[inline]
    pub fn use_gas(&mut self, amount: u64) -> Result<(), VmError> {
        if self.contract.gas < amount {
            return Err(VmError::OutOfGas);
        }
        self.contract.gas -= amount;
        Ok(())
    }

    /// Call input size, as pushed by `CALLDATASIZE`.
    pub fn call_size(&self) -> U256 {
        U256::from(self.data.len())
    }

    /// EIP-2929 account touch: first access is cold and joins the access
    /// list. Only invoked under Berlin.
    pub fn charge_account_access(&mut self, address: Address) -> Result<(), VmError> {
        if self.evm.state.address_in_access_list(address) {
            self.use_gas(WARM_STORAGE_READ_COST)
        } else {
            self.evm.state.add_address_to_access_list(address);
            self.use_gas(COLD_ACCOUNT_ACCESS_COST)
        }
    }

    /// EIP-2929 storage-slot touch for `SLOAD`. Only invoked under Berlin.
    pub fn charge_slot_access(&mut self, key: U256) -> Result<(), VmError> {
        let address = self.contract.address;
        let (_, slot_present) = self.evm.state.slot_in_access_list(address, key);
        if slot_present {
            self.use_gas(WARM_STORAGE_READ_COST)
        } else {
            self.evm.state.add_slot_to_access_list(address, key);
            self.use_gas(COLD_SLOAD_COST)
        }
    }

    /// Convert a stack word to a memory offset or size. Anything beyond
    /// `u64` cannot be paid for.
    pub fn word_to_u64(value: U256) -> Result<u64, VmError> {
        if value.bits() > 64 {
            return Err(VmError::OutOfGas);
        }
        Ok(value.as_u64())
    }

    /// Validate a jump destination and return it as an instruction index.
    pub fn check_jump_target(&self, target: U256) -> Result<usize, VmError> {
        if target.bits() > 32 {
            return Err(VmError::InvalidJump);
        }
        let index = target.as_u64() as usize;
        match self.code.get(index) {
            Some(instruction) if instruction.opcode == crate::opcodes::OpCode::JUMPDEST => {
                Ok(index)
            }
            _ => Err(VmError::InvalidJump),
        }
    }
}
