//! Gas pricing.
//!
//! The static table holds one price per long-form opcode, with
//! super-instructions carrying the sum of their components; it is computed
//! at compile time so dispatch never chases component prices. Dynamic costs
//! (SSTORE, call family, copies, logs, EXP, keccak) live in the functions
//! below. Pre-Berlin static prices follow the Istanbul schedule; under
//! Berlin the access-aware opcodes are instead charged through the
//! EIP-2929 warm/cold paths.

use crate::errors::VmError;
use crate::opcodes::{OpCode, NUM_OPCODES};
use lfvm_common::{Fork, U256};

// EIP-2200 (Istanbul)
pub const SSTORE_SENTRY_GAS: u64 = 2300;
pub const SLOAD_GAS_EIP2200: u64 = 800;
pub const SSTORE_SET_GAS: u64 = 20000;
pub const SSTORE_RESET_GAS: u64 = 5000;
pub const SSTORE_CLEARS_SCHEDULE_REFUND: u64 = 15000;

// EIP-2929 (Berlin)
pub const COLD_SLOAD_COST: u64 = 2100;
pub const COLD_ACCOUNT_ACCESS_COST: u64 = 2600;
pub const WARM_STORAGE_READ_COST: u64 = 100;

// EIP-3529 (London)
pub const SSTORE_CLEARS_SCHEDULE_REFUND_LONDON: u64 = 4800;

// Call family
pub const CALL_VALUE_TRANSFER_GAS: u64 = 9000;
pub const CALL_NEW_ACCOUNT_GAS: u64 = 25000;
pub const CALL_STIPEND: u64 = 2300;

// Create family
pub const CREATE_DATA_GAS: u64 = 200;

// Selfdestruct
pub const SELFDESTRUCT_GAS: u64 = 5000;
pub const CREATE_BY_SELFDESTRUCT_GAS: u64 = 25000;
pub const SELFDESTRUCT_REFUND_GAS: u64 = 24000;

// Per-unit dynamic prices
pub const EXP_BYTE_GAS: u64 = 50;
pub const COPY_WORD_GAS: u64 = 3;
pub const KECCAK_WORD_GAS: u64 = 6;
pub const LOG_DATA_GAS: u64 = 8;
pub const LOG_TOPIC_GAS: u64 = 375;

/// Static gas price per long-form opcode.
pub const STATIC_GAS: [u64; NUM_OPCODES] = build_static_gas_table();

#[inline]
pub fn static_gas(op: OpCode) -> u64 {
    STATIC_GAS[op as usize]
}

const fn build_static_gas_table() -> [u64; NUM_OPCODES] {
    let mut t = [0u64; NUM_OPCODES];

    // Range-priced groups.
    let mut i = OpCode::PUSH1 as usize;
    while i <= OpCode::SWAP16 as usize {
        // PUSH1..PUSH32, DUP1..DUP16, SWAP1..SWAP16 are contiguous.
        t[i] = 3;
        i += 1;
    }
    let mut i = OpCode::LT as usize;
    while i <= OpCode::SAR as usize {
        t[i] = 3;
        i += 1;
    }
    let mut i = OpCode::COINBASE as usize;
    while i <= OpCode::CHAINID as usize {
        t[i] = 2;
        i += 1;
    }

    t[OpCode::POP as usize] = 2;
    t[OpCode::ADD as usize] = 3;
    t[OpCode::SUB as usize] = 3;
    t[OpCode::MUL as usize] = 5;
    t[OpCode::DIV as usize] = 5;
    t[OpCode::SDIV as usize] = 5;
    t[OpCode::MOD as usize] = 5;
    t[OpCode::SMOD as usize] = 5;
    t[OpCode::ADDMOD as usize] = 8;
    t[OpCode::MULMOD as usize] = 8;
    t[OpCode::EXP as usize] = 10;
    t[OpCode::SIGNEXTEND as usize] = 5;
    t[OpCode::SHA3 as usize] = 30;

    t[OpCode::ADDRESS as usize] = 2;
    t[OpCode::BALANCE as usize] = 700;
    t[OpCode::ORIGIN as usize] = 2;
    t[OpCode::CALLER as usize] = 2;
    t[OpCode::CALLVALUE as usize] = 2;
    t[OpCode::CALLDATALOAD as usize] = 3;
    t[OpCode::CALLDATASIZE as usize] = 2;
    t[OpCode::CALLDATACOPY as usize] = 3;
    t[OpCode::CODESIZE as usize] = 2;
    t[OpCode::CODECOPY as usize] = 3;
    t[OpCode::GASPRICE as usize] = 2;
    t[OpCode::EXTCODESIZE as usize] = 700;
    t[OpCode::EXTCODECOPY as usize] = 100;
    t[OpCode::RETURNDATASIZE as usize] = 2;
    t[OpCode::RETURNDATACOPY as usize] = 3;
    t[OpCode::EXTCODEHASH as usize] = 700;
    t[OpCode::BLOCKHASH as usize] = 20;
    t[OpCode::SELFBALANCE as usize] = 5;
    t[OpCode::BASEFEE as usize] = 2;

    t[OpCode::MLOAD as usize] = 3;
    t[OpCode::MSTORE as usize] = 3;
    t[OpCode::MSTORE8 as usize] = 3;
    t[OpCode::SLOAD as usize] = 800;
    t[OpCode::SSTORE as usize] = 0;

    t[OpCode::JUMP as usize] = 8;
    t[OpCode::JUMPI as usize] = 10;
    t[OpCode::JUMPDEST as usize] = 1;
    t[OpCode::JUMP_TO as usize] = 0;
    t[OpCode::PC as usize] = 2;
    t[OpCode::MSIZE as usize] = 2;
    t[OpCode::GAS as usize] = 2;

    t[OpCode::LOG0 as usize] = 375;
    t[OpCode::LOG1 as usize] = 750;
    t[OpCode::LOG2 as usize] = 1125;
    t[OpCode::LOG3 as usize] = 1500;
    t[OpCode::LOG4 as usize] = 1875;

    t[OpCode::CREATE as usize] = 32000;
    t[OpCode::CREATE2 as usize] = 32000;
    t[OpCode::CALL as usize] = 700;
    t[OpCode::CALLCODE as usize] = 100;
    t[OpCode::DELEGATECALL as usize] = 700;
    t[OpCode::STATICCALL as usize] = 700;

    // STOP, RETURN, REVERT, INVALID, SELFDESTRUCT, DATA and NOOP stay 0.

    // Super-instructions: the sum of their components, resolved against the
    // base entries filled in above.
    t[OpCode::PUSH1_ADD as usize] = t[OpCode::PUSH1 as usize] + t[OpCode::ADD as usize];
    t[OpCode::PUSH1_SHL as usize] = t[OpCode::PUSH1 as usize] + t[OpCode::SHL as usize];
    t[OpCode::PUSH1_DUP1 as usize] = t[OpCode::PUSH1 as usize] + t[OpCode::DUP1 as usize];
    t[OpCode::PUSH2_JUMP as usize] = t[OpCode::PUSH2 as usize] + t[OpCode::JUMP as usize];
    t[OpCode::PUSH2_JUMPI as usize] = t[OpCode::PUSH2 as usize] + t[OpCode::JUMPI as usize];
    t[OpCode::SWAP1_POP as usize] = t[OpCode::SWAP1 as usize] + t[OpCode::POP as usize];
    t[OpCode::SWAP2_POP as usize] = t[OpCode::SWAP2 as usize] + t[OpCode::POP as usize];
    t[OpCode::DUP2_MSTORE as usize] = t[OpCode::DUP2 as usize] + t[OpCode::MSTORE as usize];
    t[OpCode::DUP2_LT as usize] = t[OpCode::DUP2 as usize] + t[OpCode::LT as usize];
    t[OpCode::POP_JUMP as usize] = t[OpCode::POP as usize] + t[OpCode::JUMP as usize];
    t[OpCode::POP_POP as usize] = t[OpCode::POP as usize] + t[OpCode::POP as usize];
    t[OpCode::SWAP2_SWAP1 as usize] = t[OpCode::SWAP2 as usize] + t[OpCode::SWAP1 as usize];
    t[OpCode::PUSH1_PUSH1 as usize] = t[OpCode::PUSH1 as usize] + t[OpCode::PUSH1 as usize];
    t[OpCode::ISZERO_PUSH2_JUMPI as usize] =
        t[OpCode::ISZERO as usize] + t[OpCode::PUSH2 as usize] + t[OpCode::JUMPI as usize];
    t[OpCode::PUSH1_PUSH4_DUP3 as usize] =
        t[OpCode::PUSH1 as usize] + t[OpCode::PUSH4 as usize] + t[OpCode::DUP3 as usize];
    t[OpCode::SWAP2_SWAP1_POP_JUMP as usize] = t[OpCode::SWAP2 as usize]
        + t[OpCode::SWAP1 as usize]
        + t[OpCode::POP as usize]
        + t[OpCode::JUMP as usize];
    t[OpCode::SWAP1_POP_SWAP2_SWAP1 as usize] = t[OpCode::SWAP1 as usize]
        + t[OpCode::POP as usize]
        + t[OpCode::SWAP2 as usize]
        + t[OpCode::SWAP1 as usize];
    t[OpCode::POP_SWAP2_SWAP1_POP as usize] = t[OpCode::POP as usize]
        + t[OpCode::SWAP2 as usize]
        + t[OpCode::SWAP1 as usize]
        + t[OpCode::POP as usize];
    t[OpCode::AND_SWAP1_POP_SWAP2_SWAP1 as usize] = t[OpCode::AND as usize]
        + t[OpCode::SWAP1 as usize]
        + t[OpCode::POP as usize]
        + t[OpCode::SWAP2 as usize]
        + t[OpCode::SWAP1 as usize];
    t[OpCode::PUSH1_PUSH1_PUSH1_SHL_SUB as usize] =
        3 * t[OpCode::PUSH1 as usize] + t[OpCode::SHL as usize] + t[OpCode::SUB as usize];

    t
}

/// Gas handed to a callee per EIP-150: all but a 64th of what remains,
/// capped by the amount requested on the stack.
pub fn call_gas(available_gas: u64, requested: U256) -> u64 {
    let cap = available_gas - available_gas / 64;
    if requested < U256::from(cap) {
        requested.as_u64()
    } else {
        cap
    }
}

/// Per-word price of the copy opcodes (CALLDATACOPY, CODECOPY,
/// RETURNDATACOPY, EXTCODECOPY).
pub fn copy_cost(size: u64) -> u64 {
    size.div_ceil(32).saturating_mul(COPY_WORD_GAS)
}

/// Per-word price of hashing `size` bytes.
pub fn keccak_cost(size: u64) -> u64 {
    size.div_ceil(32).saturating_mul(KECCAK_WORD_GAS)
}

/// Per-byte price of the exponent of `EXP`.
pub fn exp_cost(exponent: U256) -> u64 {
    let byte_len = (exponent.bits() as u64).div_ceil(8);
    EXP_BYTE_GAS * byte_len
}

/// Per-byte price of the data of `LOGn`; the topic prices are static.
pub fn log_data_cost(size: u64) -> u64 {
    size.saturating_mul(LOG_DATA_GAS)
}

/// Refund adjustment produced by an `SSTORE`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefundDelta {
    pub add: u64,
    pub sub: u64,
}

/// EIP-2200 SSTORE pricing, with the EIP-2929 constants substituted under
/// Berlin and the EIP-3529 clears-refund under London. The Berlin cold-slot
/// surcharge is charged separately by the handler. Fails the frame when the
/// 2300 gas sentry is not met.
pub fn sstore(
    fork: Fork,
    gas_left: u64,
    original: U256,
    current: U256,
    new: U256,
) -> Result<(u64, RefundDelta), VmError> {
    if gas_left <= SSTORE_SENTRY_GAS {
        return Err(VmError::OutOfGas);
    }

    let (sload_gas, reset_gas) = if fork.is_berlin() {
        (WARM_STORAGE_READ_COST, SSTORE_RESET_GAS - COLD_SLOAD_COST)
    } else {
        (SLOAD_GAS_EIP2200, SSTORE_RESET_GAS)
    };
    let clears_refund = if fork.is_london() {
        SSTORE_CLEARS_SCHEDULE_REFUND_LONDON
    } else {
        SSTORE_CLEARS_SCHEDULE_REFUND
    };

    let mut refund = RefundDelta::default();

    // No-op write.
    if current == new {
        return Ok((sload_gas, refund));
    }

    if original == current {
        // First write to this slot in the current transaction.
        if original.is_zero() {
            return Ok((SSTORE_SET_GAS, refund));
        }
        if new.is_zero() {
            refund.add += clears_refund;
        }
        return Ok((reset_gas, refund));
    }

    // Dirty slot.
    if !original.is_zero() {
        if current.is_zero() {
            refund.sub += clears_refund;
        } else if new.is_zero() {
            refund.add += clears_refund;
        }
    }
    if original == new {
        if original.is_zero() {
            refund.add += SSTORE_SET_GAS - sload_gas;
        } else {
            refund.add += reset_gas - sload_gas;
        }
    }
    Ok((sload_gas, refund))
}
