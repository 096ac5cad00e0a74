//! Rewrites byte-addressed EVM bytecode into index-addressed long-form code.
//!
//! The translator maintains one invariant: for every `JUMPDEST` at source
//! byte `p`, the corresponding long-form instruction sits at output index
//! `p`. Jumps then work directly on instruction indices. Runs of code that
//! compress (multi-byte pushes, fused super-instructions) leave the output
//! short of the byte offset; the gap before the next `JUMPDEST` is bridged
//! with a `JUMP_TO` and `NOOP` padding.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use lfvm_common::types::H160;
use lfvm_common::Address;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::errors::TranslationError;
use crate::instruction::{Code, Instruction};
use crate::opcodes::OpCode;

/// Raw EVM opcode bytes the translator inspects directly.
mod evm {
    pub const ADD: u8 = 0x01;
    pub const SUB: u8 = 0x03;
    pub const LT: u8 = 0x10;
    pub const ISZERO: u8 = 0x15;
    pub const AND: u8 = 0x16;
    pub const SHL: u8 = 0x1B;
    pub const POP: u8 = 0x50;
    pub const MSTORE: u8 = 0x52;
    pub const JUMP: u8 = 0x56;
    pub const JUMPI: u8 = 0x57;
    pub const PC: u8 = 0x58;
    pub const JUMPDEST: u8 = 0x5B;
    pub const PUSH1: u8 = 0x60;
    pub const PUSH2: u8 = 0x61;
    pub const PUSH4: u8 = 0x63;
    pub const PUSH32: u8 = 0x7F;
    pub const DUP1: u8 = 0x80;
    pub const DUP2: u8 = 0x81;
    pub const DUP3: u8 = 0x82;
    pub const SWAP1: u8 = 0x90;
    pub const SWAP2: u8 = 0x91;
}

/// Translate a contract's bytecode. Deterministic in `(code, super
/// instructions flag)`; the cached entry point is
/// [`TranslationCache::translate`].
pub fn translate(code: &[u8], with_super_instructions: bool) -> Result<Code, TranslationError> {
    let mut res: Vec<Instruction> = Vec::with_capacity(code.len());

    let mut i = 0;
    while i < code.len() {
        // Jump destinations pin the output index to the byte offset.
        if code[i] == evm::JUMPDEST {
            if res.len() > i {
                return Err(TranslationError::TargetBlockOverrun(i));
            }
            if res.len() < i {
                if i > u16::MAX as usize {
                    return Err(TranslationError::PcOutOfRange(i));
                }
                res.push(Instruction::new(OpCode::JUMP_TO, i as u16));
            }
            while res.len() < i {
                res.push(Instruction::of(OpCode::NOOP));
            }
            res.push(Instruction::of(OpCode::JUMPDEST));
            i += 1;
            continue;
        }

        i += translate_instruction(i, code, with_super_instructions, &mut res)?;
    }
    Ok(Code(res))
}

/// Emit the long-form instruction(s) for the source byte at `pos`, returning
/// how many source bytes were consumed.
fn translate_instruction(
    pos: usize,
    code: &[u8],
    with_super_instructions: bool,
    res: &mut Vec<Instruction>,
) -> Result<usize, TranslationError> {
    if with_super_instructions {
        if let Some(consumed) = translate_super_instruction(pos, code, res) {
            return Ok(consumed);
        }
    }

    let opcode = code[pos];

    if opcode == evm::PC {
        if pos > u16::MAX as usize {
            return Err(TranslationError::PcOutOfRange(pos));
        }
        res.push(Instruction::new(OpCode::PC, pos as u16));
        return Ok(1);
    }

    if (evm::PUSH1..=evm::PUSH32).contains(&opcode) {
        let n = (opcode - evm::PUSH1) as usize + 1;

        // A push without enough bytes behind it cannot be live code; this is
        // a data segment.
        if code.len() < pos + n + 2 {
            res.push(Instruction::of(OpCode::INVALID));
            return Ok(2);
        }

        // Pack the immediate two bytes per instruction: the push itself
        // carries the first pair, `DATA` entries carry the rest. An odd
        // trailing byte sits in the high half of the last slot.
        let slots = n.div_ceil(2);
        for slot in 0..slots {
            let high = code[pos + 1 + 2 * slot] as u16;
            let low = if 2 * slot + 1 < n {
                code[pos + 2 + 2 * slot] as u16
            } else {
                0
            };
            let opcode = if slot == 0 {
                push_opcode(n)
            } else {
                OpCode::DATA
            };
            res.push(Instruction::new(opcode, high << 8 | low));
        }
        return Ok(n + 1);
    }

    res.push(Instruction::of(OP_TO_OP[opcode as usize]));
    Ok(1)
}

/// Match the fixed-length super-instruction patterns, longest first.
/// Every matched position is either a checked opcode (never `JUMPDEST`) or a
/// push immediate, so a fused sequence can never straddle a jump target.
fn translate_super_instruction(pos: usize, code: &[u8], res: &mut Vec<Instruction>) -> Option<usize> {
    use OpCode::*;

    if code.len() > pos + 7 {
        let window: [u8; 8] = code[pos..pos + 8].try_into().ok()?;
        if window[0] == evm::PUSH1 && window[2] == evm::PUSH4 && window[7] == evm::DUP3 {
            res.push(Instruction::new(PUSH1_PUSH4_DUP3, window[1] as u16));
            res.push(Instruction::new(
                DATA,
                (window[3] as u16) << 8 | window[4] as u16,
            ));
            res.push(Instruction::new(
                DATA,
                (window[5] as u16) << 8 | window[6] as u16,
            ));
            return Some(8);
        }
        if window[0] == evm::PUSH1
            && window[2] == evm::PUSH1
            && window[4] == evm::PUSH1
            && window[6] == evm::SHL
            && window[7] == evm::SUB
        {
            res.push(Instruction::new(
                PUSH1_PUSH1_PUSH1_SHL_SUB,
                (window[1] as u16) << 8 | window[3] as u16,
            ));
            res.push(Instruction::new(DATA, window[5] as u16));
            return Some(8);
        }
    }
    if code.len() > pos + 4 {
        let window: [u8; 5] = code[pos..pos + 5].try_into().ok()?;
        if window == [evm::AND, evm::SWAP1, evm::POP, evm::SWAP2, evm::SWAP1] {
            res.push(Instruction::of(AND_SWAP1_POP_SWAP2_SWAP1));
            return Some(5);
        }
        if window[0] == evm::ISZERO && window[1] == evm::PUSH2 && window[4] == evm::JUMPI {
            res.push(Instruction::new(
                ISZERO_PUSH2_JUMPI,
                (window[2] as u16) << 8 | window[3] as u16,
            ));
            return Some(5);
        }
    }
    if code.len() > pos + 3 {
        let window: [u8; 4] = code[pos..pos + 4].try_into().ok()?;
        if window == [evm::SWAP2, evm::SWAP1, evm::POP, evm::JUMP] {
            res.push(Instruction::of(SWAP2_SWAP1_POP_JUMP));
            return Some(4);
        }
        if window == [evm::SWAP1, evm::POP, evm::SWAP2, evm::SWAP1] {
            res.push(Instruction::of(SWAP1_POP_SWAP2_SWAP1));
            return Some(4);
        }
        if window == [evm::POP, evm::SWAP2, evm::SWAP1, evm::POP] {
            res.push(Instruction::of(POP_SWAP2_SWAP1_POP));
            return Some(4);
        }
        if window[0] == evm::PUSH2 && window[3] == evm::JUMP {
            res.push(Instruction::new(
                PUSH2_JUMP,
                (window[1] as u16) << 8 | window[2] as u16,
            ));
            return Some(4);
        }
        if window[0] == evm::PUSH2 && window[3] == evm::JUMPI {
            res.push(Instruction::new(
                PUSH2_JUMPI,
                (window[1] as u16) << 8 | window[2] as u16,
            ));
            return Some(4);
        }
        if window[0] == evm::PUSH1 && window[2] == evm::PUSH1 {
            res.push(Instruction::new(
                PUSH1_PUSH1,
                (window[1] as u16) << 8 | window[3] as u16,
            ));
            return Some(4);
        }
    }
    if code.len() > pos + 2 {
        let window: [u8; 3] = code[pos..pos + 3].try_into().ok()?;
        if window[0] == evm::PUSH1 && window[2] == evm::ADD {
            res.push(Instruction::new(PUSH1_ADD, window[1] as u16));
            return Some(3);
        }
        if window[0] == evm::PUSH1 && window[2] == evm::SHL {
            res.push(Instruction::new(PUSH1_SHL, window[1] as u16));
            return Some(3);
        }
        if window[0] == evm::PUSH1 && window[2] == evm::DUP1 {
            res.push(Instruction::new(PUSH1_DUP1, window[1] as u16));
            return Some(3);
        }
    }
    if code.len() > pos + 1 {
        let pair = [code[pos], code[pos + 1]];
        let fused = match pair {
            [evm::SWAP1, evm::POP] => Some(SWAP1_POP),
            [evm::POP, evm::JUMP] => Some(POP_JUMP),
            [evm::POP, evm::POP] => Some(POP_POP),
            [evm::SWAP2, evm::SWAP1] => Some(SWAP2_SWAP1),
            [evm::SWAP2, evm::POP] => Some(SWAP2_POP),
            [evm::DUP2, evm::MSTORE] => Some(DUP2_MSTORE),
            [evm::DUP2, evm::LT] => Some(DUP2_LT),
            _ => None,
        };
        if let Some(opcode) = fused {
            res.push(Instruction::of(opcode));
            return Some(2);
        }
    }
    None
}

fn push_opcode(n: usize) -> OpCode {
    debug_assert!((1..=32).contains(&n));
    // PUSH1..PUSH32 are contiguous.
    PUSH_OPCODES[n - 1]
}

const PUSH_OPCODES: [OpCode; 32] = [
    OpCode::PUSH1,
    OpCode::PUSH2,
    OpCode::PUSH3,
    OpCode::PUSH4,
    OpCode::PUSH5,
    OpCode::PUSH6,
    OpCode::PUSH7,
    OpCode::PUSH8,
    OpCode::PUSH9,
    OpCode::PUSH10,
    OpCode::PUSH11,
    OpCode::PUSH12,
    OpCode::PUSH13,
    OpCode::PUSH14,
    OpCode::PUSH15,
    OpCode::PUSH16,
    OpCode::PUSH17,
    OpCode::PUSH18,
    OpCode::PUSH19,
    OpCode::PUSH20,
    OpCode::PUSH21,
    OpCode::PUSH22,
    OpCode::PUSH23,
    OpCode::PUSH24,
    OpCode::PUSH25,
    OpCode::PUSH26,
    OpCode::PUSH27,
    OpCode::PUSH28,
    OpCode::PUSH29,
    OpCode::PUSH30,
    OpCode::PUSH31,
    OpCode::PUSH32,
];

/// Raw EVM byte to long-form opcode; unknown and placeholder bytes map to
/// `INVALID`, push opcodes are handled separately.
const OP_TO_OP: [OpCode; 256] = build_op_to_op_map();

const fn build_op_to_op_map() -> [OpCode; 256] {
    let mut t = [OpCode::INVALID; 256];

    t[0x00] = OpCode::STOP;
    t[0x01] = OpCode::ADD;
    t[0x02] = OpCode::MUL;
    t[0x03] = OpCode::SUB;
    t[0x04] = OpCode::DIV;
    t[0x05] = OpCode::SDIV;
    t[0x06] = OpCode::MOD;
    t[0x07] = OpCode::SMOD;
    t[0x08] = OpCode::ADDMOD;
    t[0x09] = OpCode::MULMOD;
    t[0x0A] = OpCode::EXP;
    t[0x0B] = OpCode::SIGNEXTEND;

    t[0x10] = OpCode::LT;
    t[0x11] = OpCode::GT;
    t[0x12] = OpCode::SLT;
    t[0x13] = OpCode::SGT;
    t[0x14] = OpCode::EQ;
    t[0x15] = OpCode::ISZERO;
    t[0x16] = OpCode::AND;
    t[0x17] = OpCode::OR;
    t[0x18] = OpCode::XOR;
    t[0x19] = OpCode::NOT;
    t[0x1A] = OpCode::BYTE;
    t[0x1B] = OpCode::SHL;
    t[0x1C] = OpCode::SHR;
    t[0x1D] = OpCode::SAR;

    t[0x20] = OpCode::SHA3;

    t[0x30] = OpCode::ADDRESS;
    t[0x31] = OpCode::BALANCE;
    t[0x32] = OpCode::ORIGIN;
    t[0x33] = OpCode::CALLER;
    t[0x34] = OpCode::CALLVALUE;
    t[0x35] = OpCode::CALLDATALOAD;
    t[0x36] = OpCode::CALLDATASIZE;
    t[0x37] = OpCode::CALLDATACOPY;
    t[0x38] = OpCode::CODESIZE;
    t[0x39] = OpCode::CODECOPY;
    t[0x3A] = OpCode::GASPRICE;
    t[0x3B] = OpCode::EXTCODESIZE;
    t[0x3C] = OpCode::EXTCODECOPY;
    t[0x3D] = OpCode::RETURNDATASIZE;
    t[0x3E] = OpCode::RETURNDATACOPY;
    t[0x3F] = OpCode::EXTCODEHASH;

    t[0x40] = OpCode::BLOCKHASH;
    t[0x41] = OpCode::COINBASE;
    t[0x42] = OpCode::TIMESTAMP;
    t[0x43] = OpCode::NUMBER;
    t[0x44] = OpCode::DIFFICULTY;
    t[0x45] = OpCode::GASLIMIT;
    t[0x46] = OpCode::CHAINID;
    t[0x47] = OpCode::SELFBALANCE;
    t[0x48] = OpCode::BASEFEE;

    t[0x50] = OpCode::POP;
    t[0x51] = OpCode::MLOAD;
    t[0x52] = OpCode::MSTORE;
    t[0x53] = OpCode::MSTORE8;
    t[0x54] = OpCode::SLOAD;
    t[0x55] = OpCode::SSTORE;
    t[0x56] = OpCode::JUMP;
    t[0x57] = OpCode::JUMPI;
    t[0x58] = OpCode::PC;
    t[0x59] = OpCode::MSIZE;
    t[0x5A] = OpCode::GAS;
    t[0x5B] = OpCode::JUMPDEST;

    let mut i = 0x80;
    while i <= 0x8F {
        t[i] = dup_opcode(i - 0x80);
        i += 1;
    }
    let mut i = 0x90;
    while i <= 0x9F {
        t[i] = swap_opcode(i - 0x90);
        i += 1;
    }

    t[0xA0] = OpCode::LOG0;
    t[0xA1] = OpCode::LOG1;
    t[0xA2] = OpCode::LOG2;
    t[0xA3] = OpCode::LOG3;
    t[0xA4] = OpCode::LOG4;

    t[0xF0] = OpCode::CREATE;
    t[0xF1] = OpCode::CALL;
    t[0xF2] = OpCode::CALLCODE;
    t[0xF3] = OpCode::RETURN;
    t[0xF4] = OpCode::DELEGATECALL;
    t[0xF5] = OpCode::CREATE2;
    t[0xFA] = OpCode::STATICCALL;
    t[0xFD] = OpCode::REVERT;
    t[0xFE] = OpCode::INVALID;
    t[0xFF] = OpCode::SELFDESTRUCT;

    t
}

const fn dup_opcode(n: usize) -> OpCode {
    DUP_OPCODES[n]
}

const fn swap_opcode(n: usize) -> OpCode {
    SWAP_OPCODES[n]
}

const DUP_OPCODES: [OpCode; 16] = [
    OpCode::DUP1,
    OpCode::DUP2,
    OpCode::DUP3,
    OpCode::DUP4,
    OpCode::DUP5,
    OpCode::DUP6,
    OpCode::DUP7,
    OpCode::DUP8,
    OpCode::DUP9,
    OpCode::DUP10,
    OpCode::DUP11,
    OpCode::DUP12,
    OpCode::DUP13,
    OpCode::DUP14,
    OpCode::DUP15,
    OpCode::DUP16,
];

const SWAP_OPCODES: [OpCode; 16] = [
    OpCode::SWAP1,
    OpCode::SWAP2,
    OpCode::SWAP3,
    OpCode::SWAP4,
    OpCode::SWAP5,
    OpCode::SWAP6,
    OpCode::SWAP7,
    OpCode::SWAP8,
    OpCode::SWAP9,
    OpCode::SWAP10,
    OpCode::SWAP11,
    OpCode::SWAP12,
    OpCode::SWAP13,
    OpCode::SWAP14,
    OpCode::SWAP15,
    OpCode::SWAP16,
];

/// Addresses whose code changed on chain without a length change. A cache
/// hit for these re-verifies the stored bytes.
pub const MUTABLE_CONTRACT_ADDRESSES: [Address; 3] = [
    H160(hex_literal(b"A7CC236F81b04c1058e9bfb70E0Ee9940e271676")),
    H160(hex_literal(b"AD0FB83a110c3694faDa81e8B396716a610c4030")),
    H160(hex_literal(b"A8B3C9f298877dD93F30E8Ed359956faE10E8797")),
];

const fn hex_literal(hex: &[u8; 40]) -> [u8; 20] {
    const fn nibble(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => panic!("invalid hex digit"),
        }
    }
    let mut out = [0u8; 20];
    let mut i = 0;
    while i < 20 {
        out[i] = nibble(hex[2 * i]) << 4 | nibble(hex[2 * i + 1]);
        i += 1;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    address: Address,
    code_length: usize,
}

struct CacheEntry {
    original: Bytes,
    code: Arc<Code>,
}

/// Process-wide translation cache keyed by `(address, code length)`.
///
/// Translation runs outside the mutex; concurrent translations of the same
/// key may race, which is harmless because the result is a pure function of
/// the input and the super-instruction flag.
#[derive(Default)]
pub struct TranslationCache {
    entries: Mutex<FxHashMap<CacheKey, CacheEntry>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached translation of `code` as deployed at `address`. In creation
    /// mode (`create`) the cache is neither read nor written: init code is
    /// executed once and its address is not meaningful as a key.
    pub fn translate(
        &self,
        address: Address,
        code: &Bytes,
        with_super_instructions: bool,
        create: bool,
    ) -> Result<Arc<Code>, TranslationError> {
        let key = CacheKey {
            address,
            code_length: code.len(),
        };

        let mut mismatch = false;
        if !create {
            let entries = self.lock();
            if let Some(entry) = entries.get(&key) {
                if MUTABLE_CONTRACT_ADDRESSES.contains(&address) && entry.original != *code {
                    warn!(%address, "cached code differs for flagged address, re-translating");
                    mismatch = true;
                } else {
                    return Ok(Arc::clone(&entry.code));
                }
            }
        }

        let translated = Arc::new(translate(code, with_super_instructions)?);

        // A verification mismatch forces re-translation but not re-caching.
        if !create && !mismatch {
            self.lock().insert(
                key,
                CacheEntry {
                    original: code.clone(),
                    code: Arc::clone(&translated),
                },
            );
        }
        Ok(translated)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<CacheKey, CacheEntry>> {
        self.entries.lock().expect("poisoned translation cache lock")
    }
}
