//! Environment operations: account introspection, calldata, code and
//! return-data access, plus `GAS` and `PC`.

use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};
use crate::gas_cost;
use crate::utils::{address_to_word, right_padded_slice, word_to_address};

const CONTINUE: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

impl CallFrame<'_, '_> {
    pub fn op_address(&mut self) -> Result<OpcodeResult, VmError> {
        let address = self.contract.address;
        self.stack.push(address_to_word(address));
        CONTINUE
    }

    pub fn op_balance(&mut self) -> Result<OpcodeResult, VmError> {
        let address = word_to_address(*self.stack.peek());
        if self.is_berlin {
            self.charge_account_access(address)?;
        }
        *self.stack.peek() = self.evm.state.get_balance(address);
        CONTINUE
    }

    pub fn op_origin(&mut self) -> Result<OpcodeResult, VmError> {
        let origin = self.evm.env.origin;
        self.stack.push(address_to_word(origin));
        CONTINUE
    }

    pub fn op_caller(&mut self) -> Result<OpcodeResult, VmError> {
        let caller = self.contract.caller;
        self.stack.push(address_to_word(caller));
        CONTINUE
    }

    pub fn op_callvalue(&mut self) -> Result<OpcodeResult, VmError> {
        let value = self.contract.value;
        self.stack.push(value);
        CONTINUE
    }

    pub fn op_calldataload(&mut self) -> Result<OpcodeResult, VmError> {
        let offset = *self.stack.peek();
        let word = right_padded_slice(&self.data, offset, 32);
        *self.stack.peek() = U256::from_big_endian(&word);
        CONTINUE
    }

    pub fn op_calldatasize(&mut self) -> Result<OpcodeResult, VmError> {
        let size = self.call_size();
        self.stack.push(size);
        CONTINUE
    }

    pub fn op_calldatacopy(&mut self) -> Result<OpcodeResult, VmError> {
        let mem_offset = Self::word_to_u64(self.stack.pop())?;
        let data_offset = self.stack.pop();
        let size = Self::word_to_u64(self.stack.pop())?;

        self.use_gas(gas_cost::copy_cost(size))?;
        self.memory.grow(&mut self.contract.gas, mem_offset, size)?;
        if size > 0 {
            let chunk = right_padded_slice(&self.data, data_offset, size as usize);
            self.memory.store(&mut self.contract.gas, mem_offset, &chunk)?;
        }
        CONTINUE
    }

    pub fn op_codesize(&mut self) -> Result<OpcodeResult, VmError> {
        let size = U256::from(self.contract.code.len());
        self.stack.push(size);
        CONTINUE
    }

    pub fn op_codecopy(&mut self) -> Result<OpcodeResult, VmError> {
        let mem_offset = Self::word_to_u64(self.stack.pop())?;
        let code_offset = self.stack.pop();
        let size = Self::word_to_u64(self.stack.pop())?;

        self.use_gas(gas_cost::copy_cost(size))?;
        self.memory.grow(&mut self.contract.gas, mem_offset, size)?;
        if size > 0 {
            let chunk = right_padded_slice(&self.contract.code, code_offset, size as usize);
            self.memory.store(&mut self.contract.gas, mem_offset, &chunk)?;
        }
        CONTINUE
    }

    pub fn op_gasprice(&mut self) -> Result<OpcodeResult, VmError> {
        let gas_price = self.evm.env.gas_price;
        self.stack.push(gas_price);
        CONTINUE
    }

    pub fn op_extcodesize(&mut self) -> Result<OpcodeResult, VmError> {
        let address = word_to_address(*self.stack.peek());
        if self.is_berlin {
            self.charge_account_access(address)?;
        }
        *self.stack.peek() = U256::from(self.evm.state.get_code_size(address));
        CONTINUE
    }

    pub fn op_extcodecopy(&mut self) -> Result<OpcodeResult, VmError> {
        let address = word_to_address(self.stack.pop());
        let mem_offset = Self::word_to_u64(self.stack.pop())?;
        let code_offset = self.stack.pop();
        let size = Self::word_to_u64(self.stack.pop())?;

        if self.is_berlin {
            self.charge_account_access(address)?;
        }
        self.use_gas(gas_cost::copy_cost(size))?;
        self.memory.grow(&mut self.contract.gas, mem_offset, size)?;
        if size > 0 {
            let code = self.evm.state.get_code(address);
            let chunk = right_padded_slice(&code, code_offset, size as usize);
            self.memory.store(&mut self.contract.gas, mem_offset, &chunk)?;
        }
        CONTINUE
    }

    pub fn op_returndatasize(&mut self) -> Result<OpcodeResult, VmError> {
        let size = U256::from(self.return_data.len());
        self.stack.push(size);
        CONTINUE
    }

    pub fn op_returndatacopy(&mut self) -> Result<OpcodeResult, VmError> {
        let mem_offset = Self::word_to_u64(self.stack.pop())?;
        let data_offset = self.stack.pop();
        let size = Self::word_to_u64(self.stack.pop())?;

        self.use_gas(gas_cost::copy_cost(size))?;

        // Unlike the other copies, reading past the end of the return data
        // is a hard failure (EIP-211).
        let end = data_offset
            .checked_add(U256::from(size))
            .ok_or(VmError::ReturnDataOutOfBounds)?;
        if end > U256::from(self.return_data.len()) {
            return Err(VmError::ReturnDataOutOfBounds);
        }

        self.memory.grow(&mut self.contract.gas, mem_offset, size)?;
        if size > 0 {
            let start = data_offset.as_u64() as usize;
            let chunk = self.return_data.slice(start..start + size as usize);
            self.memory.store(&mut self.contract.gas, mem_offset, &chunk)?;
        }
        CONTINUE
    }

    pub fn op_extcodehash(&mut self) -> Result<OpcodeResult, VmError> {
        let address = word_to_address(*self.stack.peek());
        if self.is_berlin {
            self.charge_account_access(address)?;
        }
        let hash = self.evm.state.get_code_hash(address);
        *self.stack.peek() = U256::from_big_endian(hash.as_bytes());
        CONTINUE
    }

    pub fn op_gas(&mut self) -> Result<OpcodeResult, VmError> {
        // Pushed after the static charge for GAS itself.
        let gas = self.contract.gas;
        *self.stack.push_empty() = U256::from(gas);
        CONTINUE
    }

    pub fn op_pc(&mut self, arg: u16) -> Result<OpcodeResult, VmError> {
        // The argument carries the source byte position, assigned at
        // translation time.
        self.stack.push(U256::from(arg));
        CONTINUE
    }
}
