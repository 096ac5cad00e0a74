//! System operations: the call family, `CREATE`/`CREATE2` and
//! `SELFDESTRUCT`.
//!
//! Handlers pop the arguments, settle the caller-side gas (base costs,
//! memory for both regions, the EIP-150 forwarding cap) and then hand the
//! child frame to the enclosing EVM, which owns snapshots, value transfer
//! and the depth limit.

use bytes::Bytes;
use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, Status, VmError};
use crate::gas_cost::{
    self, CALL_NEW_ACCOUNT_GAS, CALL_STIPEND, CALL_VALUE_TRANSFER_GAS, COLD_ACCOUNT_ACCESS_COST,
    CREATE_BY_SELFDESTRUCT_GAS, SELFDESTRUCT_GAS, SELFDESTRUCT_REFUND_GAS,
};
use crate::utils::{address_to_word, word_to_address};
use crate::vm::{CallKind, CallParams};

const CONTINUE: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

impl CallFrame<'_, '_> {
    pub fn op_call(&mut self, kind: CallKind) -> Result<OpcodeResult, VmError> {
        let gas_requested = self.stack.pop();
        let callee = word_to_address(self.stack.pop());
        let value = match kind {
            CallKind::Call | CallKind::CallCode => self.stack.pop(),
            CallKind::DelegateCall | CallKind::StaticCall => U256::zero(),
        };
        let args_offset_word = self.stack.pop();
        let args_size = Self::word_to_u64(self.stack.pop())?;
        let ret_offset_word = self.stack.pop();
        let ret_size = Self::word_to_u64(self.stack.pop())?;
        // Offsets of empty regions are irrelevant and may be arbitrary.
        let args_offset = if args_size == 0 {
            0
        } else {
            Self::word_to_u64(args_offset_word)?
        };
        let ret_offset = if ret_size == 0 {
            0
        } else {
            Self::word_to_u64(ret_offset_word)?
        };

        if kind == CallKind::Call && self.read_only && !value.is_zero() {
            return Err(VmError::WriteProtection);
        }

        if self.is_berlin {
            self.charge_account_access(callee)?;
        }

        let mut base_cost = 0u64;
        if !value.is_zero() {
            base_cost += CALL_VALUE_TRANSFER_GAS;
            if kind == CallKind::Call && self.evm.state.is_empty(callee) {
                base_cost += CALL_NEW_ACCOUNT_GAS;
            }
        }
        self.use_gas(base_cost)?;

        self.memory
            .grow(&mut self.contract.gas, args_offset, args_size)?;
        self.memory
            .grow(&mut self.contract.gas, ret_offset, ret_size)?;

        // EIP-150: forward at most all but a 64th of what is left.
        let mut gas_limit = gas_cost::call_gas(self.contract.gas, gas_requested);
        self.use_gas(gas_limit)?;
        if !value.is_zero() {
            gas_limit += CALL_STIPEND;
        }

        let input = Bytes::copy_from_slice(self.memory.slice(args_offset, args_size));

        let params = match kind {
            CallKind::Call => CallParams {
                kind,
                code_address: callee,
                context_address: callee,
                caller: self.contract.address,
                value,
                transfer_value: value,
                input,
                gas: gas_limit,
                read_only: self.read_only,
            },
            CallKind::CallCode => CallParams {
                kind,
                code_address: callee,
                context_address: self.contract.address,
                caller: self.contract.address,
                value,
                transfer_value: value,
                input,
                gas: gas_limit,
                read_only: self.read_only,
            },
            CallKind::DelegateCall => CallParams {
                kind,
                code_address: callee,
                context_address: self.contract.address,
                caller: self.contract.caller,
                value: self.contract.value,
                transfer_value: U256::zero(),
                input,
                gas: gas_limit,
                read_only: self.read_only,
            },
            CallKind::StaticCall => CallParams {
                kind,
                code_address: callee,
                context_address: callee,
                caller: self.contract.address,
                value: U256::zero(),
                transfer_value: U256::zero(),
                input,
                gas: gas_limit,
                read_only: true,
            },
        };

        let result = self.evm.call_contract(params);

        self.contract.gas += result.gas_left;
        self.return_data = result.output.clone();

        if ret_size > 0 && !result.output.is_empty() {
            let n = (result.output.len() as u64).min(ret_size) as usize;
            let chunk = result.output.slice(..n);
            self.memory
                .store(&mut self.contract.gas, ret_offset, &chunk)?;
        }

        let success = result.is_success();
        self.stack
            .push(if success { U256::one() } else { U256::zero() });
        CONTINUE
    }

    pub fn op_create(&mut self, is_create2: bool) -> Result<OpcodeResult, VmError> {
        let value = self.stack.pop();
        let offset_word = self.stack.pop();
        let size = Self::word_to_u64(self.stack.pop())?;
        let offset = if size == 0 {
            0
        } else {
            Self::word_to_u64(offset_word)?
        };
        let salt = if is_create2 {
            Some(self.stack.pop())
        } else {
            None
        };

        self.memory.grow(&mut self.contract.gas, offset, size)?;
        if is_create2 {
            // CREATE2 pays for hashing the init code.
            self.use_gas(gas_cost::keccak_cost(size))?;
        }
        let init_code = Bytes::copy_from_slice(self.memory.slice(offset, size));

        let gas_limit = self.contract.gas - self.contract.gas / 64;
        self.use_gas(gas_limit)?;

        let (result, created) =
            self.evm
                .create_contract(self.contract.address, value, init_code, gas_limit, salt);

        self.contract.gas += result.gas_left;
        // Per EIP-211 the create family only exposes return data on revert.
        self.return_data = if result.status == Status::Reverted {
            result.output.clone()
        } else {
            Bytes::new()
        };

        match created {
            Some(address) => self.stack.push(address_to_word(address)),
            None => self.stack.push(U256::zero()),
        }
        CONTINUE
    }

    pub fn op_selfdestruct(&mut self) -> Result<OpcodeResult, VmError> {
        let beneficiary = word_to_address(self.stack.pop());
        let address = self.contract.address;

        if self.is_berlin && !self.evm.state.address_in_access_list(beneficiary) {
            self.evm.state.add_address_to_access_list(beneficiary);
            self.use_gas(COLD_ACCOUNT_ACCESS_COST)?;
        }

        let balance = self.evm.state.get_balance(address);
        let mut cost = SELFDESTRUCT_GAS;
        if self.evm.state.is_empty(beneficiary) && !balance.is_zero() {
            cost += CREATE_BY_SELFDESTRUCT_GAS;
        }
        self.use_gas(cost)?;

        // EIP-3529 removed the selfdestruct refund.
        if !self.is_london && !self.evm.state.has_suicided(address) {
            self.evm.state.add_refund(SELFDESTRUCT_REFUND_GAS);
        }

        self.evm.state.add_balance(beneficiary, balance);
        self.evm.state.suicide(address);
        self.status = Status::Suicided;
        Ok(OpcodeResult::Halt)
    }
}
