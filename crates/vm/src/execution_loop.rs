//! The dispatch loop.
//!
//! Fetch, pre-check, execute, advance. Pre-checks run in a fixed order:
//! stack underflow, stack overflow (against the aggregate net delta), the
//! write lock, then the static gas charge. Dynamic gas is the handler's
//! business. Any failure folds into a terminal status on the frame; nothing
//! unwinds out of [`run`].

use std::time::Instant;

use lfvm_common::constants::STACK_LIMIT;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, Status, VmError};
use crate::gas_cost::static_gas;
use crate::instruction::Instruction;
use crate::opcodes::OpCode;
use crate::vm::CallKind;

/// Drive `frame` to a terminal status. Expects a fresh frame: empty stack,
/// empty memory, `pc = 0`, `status = Running`.
pub fn run(frame: &mut CallFrame<'_, '_>) {
    let statistics = frame.evm.config.statistics;

    while frame.status == Status::Running {
        let Some(instruction) = frame.code.get(frame.pc).copied() else {
            // Running off the end of the code is a regular stop.
            frame.status = Status::Stopped;
            return;
        };

        let started = statistics.then(Instant::now);

        match step(frame, instruction) {
            Ok(OpcodeResult::Continue { pc_increment }) => frame.pc += pc_increment,
            Ok(OpcodeResult::Halt) => {}
            Err(err) => {
                frame.status = err.status();
                frame.err = Some(err);
            }
        }

        if let Some(started) = started {
            frame
                .evm
                .observer
                .observe(instruction.opcode, started.elapsed());
        }
    }
}

fn step(
    frame: &mut CallFrame<'_, '_>,
    instruction: Instruction,
) -> Result<OpcodeResult, VmError> {
    use OpCode::*;

    let op = instruction.opcode;
    let arg = instruction.arg;

    // `DATA` carries push immediates; control flow must never land on it.
    if op == DATA {
        return Err(VmError::UnexpectedDataInstruction);
    }

    let usage = op.stack_usage();
    let sp = frame.stack.len();
    if sp < usage.required {
        return Err(VmError::StackUnderflow);
    }
    if sp as isize + usage.net > STACK_LIMIT as isize {
        return Err(VmError::StackOverflow);
    }

    if frame.read_only && op.is_write_instruction() {
        return Err(VmError::WriteProtection);
    }

    // Access-aware opcodes are priced by their handlers under Berlin
    // (EIP-2929) instead of the static table.
    if !(frame.is_berlin && op.is_access_cost_instruction()) {
        frame.use_gas(static_gas(op))?;
    }

    match op {
        POP => frame.op_pop(),
        op if op.is_push() => frame.op_push(op.push_size()),
        op if DUP1 <= op && op <= DUP16 => frame.op_dup(op as usize - DUP1 as usize + 1),
        op if SWAP1 <= op && op <= SWAP16 => frame.op_swap(op as usize - SWAP1 as usize + 1),

        LT => frame.op_lt(),
        GT => frame.op_gt(),
        SLT => frame.op_slt(),
        SGT => frame.op_sgt(),
        EQ => frame.op_eq(),
        ISZERO => frame.op_iszero(),
        AND => frame.op_and(),
        OR => frame.op_or(),
        XOR => frame.op_xor(),
        NOT => frame.op_not(),
        BYTE => frame.op_byte(),
        SHL => frame.op_shl(),
        SHR => frame.op_shr(),
        SAR => frame.op_sar(),

        ADD => frame.op_add(),
        MUL => frame.op_mul(),
        SUB => frame.op_sub(),
        DIV => frame.op_div(),
        SDIV => frame.op_sdiv(),
        MOD => frame.op_mod(),
        SMOD => frame.op_smod(),
        ADDMOD => frame.op_addmod(),
        MULMOD => frame.op_mulmod(),
        EXP => frame.op_exp(),
        SIGNEXTEND => frame.op_signextend(),

        SHA3 => frame.op_sha3(),

        MLOAD => frame.op_mload(),
        MSTORE => frame.op_mstore(),
        MSTORE8 => frame.op_mstore8(),
        MSIZE => frame.op_msize(),
        SLOAD => frame.op_sload(),
        SSTORE => frame.op_sstore(),

        JUMP => frame.op_jump(),
        JUMPI => frame.op_jumpi(),
        JUMPDEST => frame.op_jumpdest(),
        STOP => frame.op_stop(),
        RETURN => frame.op_return(),
        REVERT => frame.op_revert(),
        INVALID => frame.op_invalid(),
        PC => frame.op_pc(arg),

        ADDRESS => frame.op_address(),
        BALANCE => frame.op_balance(),
        ORIGIN => frame.op_origin(),
        CALLER => frame.op_caller(),
        CALLVALUE => frame.op_callvalue(),
        CALLDATALOAD => frame.op_calldataload(),
        CALLDATASIZE => frame.op_calldatasize(),
        CALLDATACOPY => frame.op_calldatacopy(),
        CODESIZE => frame.op_codesize(),
        CODECOPY => frame.op_codecopy(),
        GASPRICE => frame.op_gasprice(),
        EXTCODESIZE => frame.op_extcodesize(),
        EXTCODECOPY => frame.op_extcodecopy(),
        RETURNDATASIZE => frame.op_returndatasize(),
        RETURNDATACOPY => frame.op_returndatacopy(),
        EXTCODEHASH => frame.op_extcodehash(),
        GAS => frame.op_gas(),

        BLOCKHASH => frame.op_blockhash(),
        COINBASE => frame.op_coinbase(),
        TIMESTAMP => frame.op_timestamp(),
        NUMBER => frame.op_number(),
        DIFFICULTY => frame.op_difficulty(),
        GASLIMIT => frame.op_gaslimit(),
        CHAINID => frame.op_chainid(),
        SELFBALANCE => frame.op_selfbalance(),
        BASEFEE => frame.op_basefee(),

        LOG0 => frame.op_log(0),
        LOG1 => frame.op_log(1),
        LOG2 => frame.op_log(2),
        LOG3 => frame.op_log(3),
        LOG4 => frame.op_log(4),

        CREATE => frame.op_create(false),
        CREATE2 => frame.op_create(true),
        CALL => frame.op_call(CallKind::Call),
        CALLCODE => frame.op_call(CallKind::CallCode),
        DELEGATECALL => frame.op_call(CallKind::DelegateCall),
        STATICCALL => frame.op_call(CallKind::StaticCall),
        SELFDESTRUCT => frame.op_selfdestruct(),

        SWAP2_SWAP1_POP_JUMP => frame.op_swap2_swap1_pop_jump(),
        SWAP1_POP_SWAP2_SWAP1 => frame.op_swap1_pop_swap2_swap1(),
        POP_SWAP2_SWAP1_POP => frame.op_pop_swap2_swap1_pop(),
        POP_POP => frame.op_pop_pop(),
        PUSH1_SHL => frame.op_push1_shl(arg),
        PUSH1_ADD => frame.op_push1_add(arg),
        PUSH1_DUP1 => frame.op_push1_dup1(arg),
        PUSH2_JUMP => frame.op_push2_jump(arg),
        PUSH2_JUMPI => frame.op_push2_jumpi(arg),
        PUSH1_PUSH1 => frame.op_push1_push1(arg),
        SWAP1_POP => frame.op_swap1_pop(),
        POP_JUMP => frame.op_pop_jump(),
        SWAP2_SWAP1 => frame.op_swap2_swap1(),
        SWAP2_POP => frame.op_swap2_pop(),
        DUP2_MSTORE => frame.op_dup2_mstore(),
        DUP2_LT => frame.op_dup2_lt(),
        ISZERO_PUSH2_JUMPI => frame.op_iszero_push2_jumpi(arg),
        PUSH1_PUSH4_DUP3 => frame.op_push1_push4_dup3(arg),
        AND_SWAP1_POP_SWAP2_SWAP1 => frame.op_and_swap1_pop_swap2_swap1(),
        PUSH1_PUSH1_PUSH1_SHL_SUB => frame.op_push1_push1_push1_shl_sub(arg),

        JUMP_TO => frame.op_jump_to(arg),
        NOOP => frame.op_noop(),

        // The push, dup and swap ranges are dispatched by the guards above;
        // DATA was rejected before the pre-checks.
        _ => Err(VmError::UnexpectedDataInstruction),
    }
}
