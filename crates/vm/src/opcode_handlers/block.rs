//! Block-context operations: `BLOCKHASH`, `COINBASE`, `TIMESTAMP`,
//! `NUMBER`, `DIFFICULTY`, `GASLIMIT`, `CHAINID`, `SELFBALANCE`, `BASEFEE`.

use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};
use crate::utils::address_to_word;

const CONTINUE: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

impl CallFrame<'_, '_> {
    pub fn op_blockhash(&mut self) -> Result<OpcodeResult, VmError> {
        let number = self.stack.peek();
        let current = self.evm.env.block_number;

        // Only the 256 most recent blocks are addressable.
        let in_range = *number < current
            && *number + U256::from(256) >= current
            && number.bits() <= 64;
        *number = if in_range {
            let hash = self.evm.state.get_block_hash(number.as_u64());
            U256::from_big_endian(hash.as_bytes())
        } else {
            U256::zero()
        };
        CONTINUE
    }

    pub fn op_coinbase(&mut self) -> Result<OpcodeResult, VmError> {
        let coinbase = self.evm.env.coinbase;
        self.stack.push(address_to_word(coinbase));
        CONTINUE
    }

    pub fn op_timestamp(&mut self) -> Result<OpcodeResult, VmError> {
        let timestamp = self.evm.env.timestamp;
        self.stack.push(timestamp);
        CONTINUE
    }

    pub fn op_number(&mut self) -> Result<OpcodeResult, VmError> {
        let number = self.evm.env.block_number;
        self.stack.push(number);
        CONTINUE
    }

    pub fn op_difficulty(&mut self) -> Result<OpcodeResult, VmError> {
        let difficulty = self.evm.env.difficulty;
        self.stack.push(difficulty);
        CONTINUE
    }

    pub fn op_gaslimit(&mut self) -> Result<OpcodeResult, VmError> {
        let gas_limit = self.evm.env.block_gas_limit;
        self.stack.push(U256::from(gas_limit));
        CONTINUE
    }

    pub fn op_chainid(&mut self) -> Result<OpcodeResult, VmError> {
        let chain_id = self.evm.env.chain_id;
        self.stack.push(chain_id);
        CONTINUE
    }

    pub fn op_selfbalance(&mut self) -> Result<OpcodeResult, VmError> {
        let balance = self.evm.state.get_balance(self.contract.address);
        self.stack.push(balance);
        CONTINUE
    }

    pub fn op_basefee(&mut self) -> Result<OpcodeResult, VmError> {
        // BASEFEE only exists from London on.
        if !self.is_london {
            return Err(VmError::InvalidInstruction);
        }
        let base_fee = self.evm.env.base_fee;
        self.stack.push(base_fee);
        CONTINUE
    }
}
