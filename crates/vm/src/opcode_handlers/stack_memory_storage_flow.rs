//! Stack, memory, storage and control-flow operations: `POP`, `MLOAD`,
//! `MSTORE`, `MSTORE8`, `MSIZE`, `SLOAD`, `SSTORE`, `JUMP`, `JUMPI`,
//! `JUMPDEST`, `JUMP_TO`, `NOOP`, `STOP`, `RETURN`, `REVERT`, `INVALID`.

use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, Status, VmError};
use crate::gas_cost::{self, COLD_SLOAD_COST};

const CONTINUE: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Continue { pc_increment: 1 });
const HALT: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Halt);

impl CallFrame<'_, '_> {
    pub fn op_pop(&mut self) -> Result<OpcodeResult, VmError> {
        self.stack.pop();
        CONTINUE
    }

    pub fn op_mload(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(*self.stack.peek())?;
        let word = self.memory.load_word(&mut self.contract.gas, offset)?;
        *self.stack.peek() = word;
        CONTINUE
    }

    pub fn op_mstore(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(self.stack.pop())?;
        let value = self.stack.pop();
        self.memory
            .store_word(&mut self.contract.gas, offset, value)?;
        CONTINUE
    }

    pub fn op_mstore8(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(self.stack.pop())?;
        let value = self.stack.pop();
        self.memory
            .store_byte(&mut self.contract.gas, offset, value.byte(0))?;
        CONTINUE
    }

    pub fn op_msize(&mut self) -> Result<OpcodeResult, VmError> {
        let size = self.memory.size();
        *self.stack.push_empty() = U256::from(size);
        CONTINUE
    }

    pub fn op_sload(&mut self) -> Result<OpcodeResult, VmError> {
        let key = *self.stack.peek();
        if self.is_berlin {
            self.charge_slot_access(key)?;
        }
        *self.stack.peek() = self.evm.state.get_state(self.contract.address, key);
        CONTINUE
    }

    pub fn op_sstore(&mut self) -> Result<OpcodeResult, VmError> {
        let key = self.stack.pop();
        let new = self.stack.pop();
        let address = self.contract.address;

        let current = self.evm.state.get_state(address, key);
        let original = self.evm.state.get_committed_state(address, key);

        let (mut cost, refund) = gas_cost::sstore(
            self.evm.env.fork,
            self.contract.gas,
            original,
            current,
            new,
        )?;

        if self.is_berlin {
            let (_, slot_present) = self.evm.state.slot_in_access_list(address, key);
            if !slot_present {
                self.evm.state.add_slot_to_access_list(address, key);
                cost += COLD_SLOAD_COST;
            }
        }
        self.use_gas(cost)?;

        if refund.add > 0 {
            self.evm.state.add_refund(refund.add);
        }
        if refund.sub > 0 {
            self.evm.state.sub_refund(refund.sub);
        }

        self.evm.state.set_state(address, key, new);
        CONTINUE
    }

    pub fn op_jump(&mut self) -> Result<OpcodeResult, VmError> {
        let target = self.stack.pop();
        self.pc = self.check_jump_target(target)?;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    pub fn op_jumpi(&mut self) -> Result<OpcodeResult, VmError> {
        let target = self.stack.pop();
        let condition = self.stack.pop();
        if condition.is_zero() {
            return CONTINUE;
        }
        self.pc = self.check_jump_target(target)?;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    pub fn op_jumpdest(&mut self) -> Result<OpcodeResult, VmError> {
        CONTINUE
    }

    /// Translator-emitted unconditional jump bridging padded regions.
    pub fn op_jump_to(&mut self, arg: u16) -> Result<OpcodeResult, VmError> {
        self.pc = arg as usize;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    pub fn op_noop(&mut self) -> Result<OpcodeResult, VmError> {
        CONTINUE
    }

    pub fn op_stop(&mut self) -> Result<OpcodeResult, VmError> {
        self.status = Status::Stopped;
        HALT
    }

    pub fn op_return(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(self.stack.pop())?;
        let size = Self::word_to_u64(self.stack.pop())?;
        self.memory.grow(&mut self.contract.gas, offset, size)?;
        self.result_offset = offset;
        self.result_size = size;
        self.status = Status::Returned;
        HALT
    }

    pub fn op_revert(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(self.stack.pop())?;
        let size = Self::word_to_u64(self.stack.pop())?;
        self.memory.grow(&mut self.contract.gas, offset, size)?;
        self.result_offset = offset;
        self.result_size = size;
        self.status = Status::Reverted;
        HALT
    }

    pub fn op_invalid(&mut self) -> Result<OpcodeResult, VmError> {
        Err(VmError::InvalidInstruction)
    }
}
