//! `SHA3`.

use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};
use crate::gas_cost;

impl CallFrame<'_, '_> {
    pub fn op_sha3(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(self.stack.pop())?;
        let size = Self::word_to_u64(*self.stack.peek())?;

        self.use_gas(gas_cost::keccak_cost(size))?;
        self.memory.grow(&mut self.contract.gas, offset, size)?;

        let digest = {
            let data = self.memory.slice(offset, size);
            self.evm.runtime.keccak(&mut self.hasher, data)
        };
        *self.stack.peek() = U256::from_big_endian(digest.as_bytes());
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
