//! Interpreter behavior: the status machine, stack boundary checks, jumps,
//! nested calls and creation, and the fib contract end to end.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{run_contract, run_instructions, run_instructions_with_state, TEST_GAS};
use lfvm::call_frame::Contract;
use lfvm::db::{InMemoryState, WorldState};
use lfvm::environment::Environment;
use lfvm::errors::{Status, VmError};
use lfvm::instruction::Instruction;
use lfvm::opcodes::OpCode;
use lfvm::runtime::Runtime;
use lfvm::vm::Evm;
use lfvm_common::{Address, Fork, U256};

use OpCode::*;

fn instr(opcode: OpCode, arg: u16) -> Instruction {
    Instruction::new(opcode, arg)
}

fn code(ops: &[(OpCode, u16)]) -> Vec<Instruction> {
    ops.iter().map(|(op, arg)| instr(*op, *arg)).collect()
}

#[test]
fn push_pop_stop_runs_to_completion() {
    let outcome = run_instructions(
        code(&[(PUSH1, 0x0100), (POP, 0), (STOP, 0)]),
        0,
        Fork::Istanbul,
        true,
    );
    assert_eq!(outcome.status, Status::Stopped);
    assert_eq!(TEST_GAS - outcome.gas_left, 3 + 2);
}

#[test]
fn jump_lands_on_its_destination() {
    let outcome = run_instructions(
        code(&[(PUSH1, 0x0200), (JUMP, 0), (JUMPDEST, 0), (STOP, 0)]),
        0,
        Fork::Istanbul,
        true,
    );
    assert_eq!(outcome.status, Status::Stopped);
    assert_eq!(TEST_GAS - outcome.gas_left, 3 + 8 + 1);
    assert_eq!(outcome.pc, 3); // halted on the STOP
}

#[test]
fn taken_jumpi_behaves_like_jump() {
    let outcome = run_instructions(
        code(&[
            (PUSH1, 0x0100),
            (PUSH1, 0x0300),
            (JUMPI, 0),
            (JUMPDEST, 0),
            (STOP, 0),
        ]),
        0,
        Fork::Istanbul,
        true,
    );
    assert_eq!(outcome.status, Status::Stopped);
}

#[test]
fn untaken_jumpi_falls_through() {
    let outcome = run_instructions(
        code(&[
            (PUSH1, 0x0000),
            (PUSH1, 0x0300),
            (JUMPI, 0),
            (JUMPDEST, 0),
            (STOP, 0),
        ]),
        0,
        Fork::Istanbul,
        true,
    );
    assert_eq!(outcome.status, Status::Stopped);
}

#[test]
fn jump_to_a_non_jumpdest_fails() {
    let outcome = run_instructions(
        code(&[(PUSH1, 0x0300), (JUMP, 0), (STOP, 0), (STOP, 0)]),
        0,
        Fork::Istanbul,
        true,
    );
    assert_eq!(outcome.status, Status::Error);
}

#[test]
fn running_off_the_end_of_code_stops() {
    let outcome = run_instructions(code(&[(JUMPDEST, 0)]), 0, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Stopped);
}

#[test]
fn return_and_revert_set_their_statuses() {
    let outcome = run_instructions(code(&[(RETURN, 0)]), 20, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Returned);

    let outcome = run_instructions(code(&[(REVERT, 0)]), 20, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Reverted);
}

#[test]
fn invalid_keeps_the_frame_status_error() {
    let outcome = run_instructions(code(&[(INVALID, 0)]), 0, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Error);
}

#[test]
fn invalid_consumes_all_gas_at_the_boundary() {
    let (result, gas_left) = run_contract(
        "lfvm",
        Bytes::from_static(&[0xFE]),
        Bytes::new(),
        Fork::Istanbul,
    );
    assert_eq!(result.unwrap_err(), VmError::InvalidInstruction);
    assert_eq!(gas_left, 0);
}

#[test]
fn data_reached_by_control_flow_is_an_error() {
    let outcome = run_instructions(code(&[(DATA, 0)]), 0, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Error);
}

#[test]
fn noop_and_jump_to_bridge_padding() {
    let outcome = run_instructions(
        code(&[
            (JUMP_TO, 3),
            (DATA, 0),
            (DATA, 0),
            (NOOP, 0),
            (STOP, 0),
        ]),
        0,
        Fork::Istanbul,
        true,
    );
    assert_eq!(outcome.status, Status::Stopped);
}

#[test]
fn write_in_read_only_frame_is_rejected() {
    let outcome = run_instructions(code(&[(SSTORE, 0)]), 2, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Error);

    let outcome = run_instructions(code(&[(LOG0, 0)]), 2, Fork::Istanbul, true);
    assert_eq!(outcome.status, Status::Error);
}

const EMPTY_STACK_FAIL_OPCODES: &[OpCode] = &[
    POP, ADD, SUB, MUL, DIV, SDIV, MOD, SMOD, EXP, SIGNEXTEND, SHA3, LT, GT, SLT, SGT, EQ, AND,
    XOR, OR, BYTE, SHL, SHR, SAR, ADDMOD, MULMOD, ISZERO, NOT, BALANCE, CALLDATALOAD, EXTCODESIZE,
    BLOCKHASH, MLOAD, SLOAD, EXTCODEHASH, JUMP, SELFDESTRUCT, MSTORE, MSTORE8, SSTORE, JUMPI,
    RETURN, REVERT, CALLDATACOPY, CODECOPY, RETURNDATACOPY, EXTCODECOPY, CREATE, CREATE2, CALL,
    CALLCODE, STATICCALL, DELEGATECALL, POP_POP, POP_JUMP, SWAP2_POP, PUSH1_ADD, PUSH1_SHL,
    SWAP2_SWAP1_POP_JUMP, PUSH2_JUMPI, ISZERO_PUSH2_JUMPI, SWAP2_SWAP1, DUP2_LT,
    SWAP1_POP_SWAP2_SWAP1, POP_SWAP2_SWAP1_POP, AND_SWAP1_POP_SWAP2_SWAP1, SWAP1_POP, DUP2_MSTORE,
    PUSH1_PUSH4_DUP3,
];

const FULL_STACK_FAIL_OPCODES: &[OpCode] = &[
    MSIZE, ADDRESS, ORIGIN, CALLER, CALLVALUE, CALLDATASIZE, CODESIZE, GASPRICE, COINBASE,
    TIMESTAMP, NUMBER, DIFFICULTY, GASLIMIT, PC, GAS, RETURNDATASIZE, SELFBALANCE, CHAINID,
    BASEFEE, PUSH1_PUSH1_PUSH1_SHL_SUB, PUSH1_DUP1, PUSH1_PUSH1, PUSH1_PUSH4_DUP3,
];

const PUSH_OPCODES: [OpCode; 32] = [
    PUSH1, PUSH2, PUSH3, PUSH4, PUSH5, PUSH6, PUSH7, PUSH8, PUSH9, PUSH10, PUSH11, PUSH12, PUSH13,
    PUSH14, PUSH15, PUSH16, PUSH17, PUSH18, PUSH19, PUSH20, PUSH21, PUSH22, PUSH23, PUSH24,
    PUSH25, PUSH26, PUSH27, PUSH28, PUSH29, PUSH30, PUSH31, PUSH32,
];

const DUP_OPCODES: [OpCode; 16] = [
    DUP1, DUP2, DUP3, DUP4, DUP5, DUP6, DUP7, DUP8, DUP9, DUP10, DUP11, DUP12, DUP13, DUP14,
    DUP15, DUP16,
];

const SWAP_OPCODES: [OpCode; 16] = [
    SWAP1, SWAP2, SWAP3, SWAP4, SWAP5, SWAP6, SWAP7, SWAP8, SWAP9, SWAP10, SWAP11, SWAP12, SWAP13,
    SWAP14, SWAP15, SWAP16,
];

fn push_n(n: usize) -> OpCode {
    PUSH_OPCODES[n - 1]
}

fn dup_n(n: usize) -> OpCode {
    DUP_OPCODES[n - 1]
}

fn swap_n(n: usize) -> OpCode {
    SWAP_OPCODES[n - 1]
}

#[test]
fn every_popping_opcode_underflows_on_an_empty_stack() {
    let mut ops: Vec<OpCode> = EMPTY_STACK_FAIL_OPCODES.to_vec();
    for n in 1..=16 {
        ops.push(dup_n(n));
        ops.push(swap_n(n));
    }
    ops.extend_from_slice(&[LOG0, LOG1, LOG2, LOG3, LOG4]);

    for op in ops {
        let outcome = run_instructions(vec![instr(op, 1)], 0, Fork::Istanbul, true);
        assert_eq!(outcome.status, Status::Error, "{op} must underflow");
    }
}

#[test]
fn every_pushing_opcode_overflows_on_a_full_stack() {
    let mut ops: Vec<OpCode> = FULL_STACK_FAIL_OPCODES.to_vec();
    for n in 1..=32 {
        ops.push(push_n(n));
    }
    for n in 1..=16 {
        ops.push(dup_n(n));
    }

    for op in ops {
        let outcome = run_instructions(vec![instr(op, 1)], 1024, Fork::Istanbul, true);
        assert_eq!(outcome.status, Status::Error, "{op} must overflow");
    }
}

#[test]
fn harmless_opcodes_run_on_a_seeded_stack() {
    let mut cases: Vec<Vec<Instruction>> = Vec::new();

    // Pushes with their immediate slots.
    for n in 1..=32usize {
        let mut program = vec![instr(push_n(n), 1)];
        for _ in 1..n.div_ceil(2) {
            program.push(instr(DATA, 1));
        }
        cases.push(program);
    }

    for n in 1..=16 {
        cases.push(vec![instr(dup_n(n), 1)]);
        cases.push(vec![instr(swap_n(n), 1)]);
    }

    let singles = [
        ADD, MUL, SUB, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND, LT, GT, SLT, SGT,
        EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR, SHA3, MLOAD, MSTORE, MSTORE8, MSIZE,
        POP, PC, GAS, ADDRESS, ORIGIN, CALLER, CALLVALUE, CALLDATASIZE, CALLDATALOAD, CODESIZE,
        GASPRICE, RETURNDATASIZE, COINBASE, TIMESTAMP, NUMBER, DIFFICULTY, GASLIMIT, CHAINID,
        SELFBALANCE, BALANCE, BLOCKHASH, SWAP1_POP_SWAP2_SWAP1, POP_SWAP2_SWAP1_POP, POP_POP,
        PUSH1_SHL, PUSH1_ADD, PUSH1_DUP1, PUSH1_PUSH1, SWAP1_POP, SWAP2_SWAP1, SWAP2_POP,
        DUP2_MSTORE, DUP2_LT, AND_SWAP1_POP_SWAP2_SWAP1, PUSH2_JUMPI,
    ];
    for op in singles {
        cases.push(vec![instr(op, 1)]);
    }
    cases.push(vec![instr(PUSH1_PUSH1_PUSH1_SHL_SUB, 1), instr(DATA, 1)]);
    cases.push(vec![
        instr(PUSH1_PUSH4_DUP3, 1),
        instr(DATA, 1),
        instr(DATA, 1),
    ]);

    for program in cases {
        let name = program[0].opcode;
        let outcome = run_instructions(program, 20, Fork::Istanbul, true);
        assert_eq!(outcome.status, Status::Stopped, "{name} must run clean");
    }
}

#[test]
fn super_instructions_match_their_expansions() {
    // PUSH1 7; PUSH1 5; ADD-style fusion: run the fused form and the
    // expansion on identical stacks and compare the outcome.
    let fused = run_instructions(
        code(&[(PUSH1_ADD, 0x0005), (STOP, 0)]),
        20,
        Fork::Istanbul,
        true,
    );
    let expanded = run_instructions(
        code(&[(PUSH1, 0x0500), (ADD, 0), (STOP, 0)]),
        20,
        Fork::Istanbul,
        true,
    );
    assert_eq!(fused.status, expanded.status);
    assert_eq!(fused.stack, expanded.stack);
    assert_eq!(fused.gas_left, expanded.gas_left);

    let fused = run_instructions(
        code(&[(SWAP2_SWAP1, 0), (STOP, 0)]),
        20,
        Fork::Istanbul,
        true,
    );
    let expanded = run_instructions(
        code(&[(SWAP2, 0), (SWAP1, 0), (STOP, 0)]),
        20,
        Fork::Istanbul,
        true,
    );
    assert_eq!(fused.stack, expanded.stack);
    assert_eq!(fused.gas_left, expanded.gas_left);
}

#[test]
fn selfdestruct_transfers_the_balance() {
    let mut state = InMemoryState::new();
    state.add_account(Address::zero(), U256::from(100), Bytes::new());

    let beneficiary = Address::repeat_byte(0xBE);
    let outcome = run_instructions_with_state(
        code(&[
            (PUSH20, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (DATA, 0xBEBE),
            (SELFDESTRUCT, 0),
        ]),
        0,
        Fork::Istanbul,
        false,
        TEST_GAS,
        &mut state,
    );
    assert_eq!(outcome.status, Status::Suicided);
    assert_eq!(state.get_balance(beneficiary), U256::from(100));
    assert_eq!(state.get_balance(Address::zero()), U256::zero());
    assert!(state.has_suicided(Address::zero()));
}

#[test]
fn nested_call_returns_data_into_caller_memory() {
    let mut state = InMemoryState::new();

    // Callee: PUSH1 42; PUSH1 0; MSTORE; PUSH1 32; PUSH1 0; RETURN
    let callee_address = Address::repeat_byte(0x02);
    let callee_code = Bytes::from_static(&[
        0x60, 0x2A, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3,
    ]);
    state.add_account(callee_address, U256::zero(), callee_code);

    // Caller: CALL(gas=0xFFFF, callee, value=0, in=0/0, out=0/32),
    // then return memory[0..32].
    let mut caller_code = vec![
        0x60, 0x20, // PUSH1 32 (ret size)
        0x60, 0x00, // PUSH1 0  (ret offset)
        0x60, 0x00, // PUSH1 0  (args size)
        0x60, 0x00, // PUSH1 0  (args offset)
        0x60, 0x00, // PUSH1 0  (value)
        0x73, // PUSH20 callee
    ];
    caller_code.extend_from_slice(callee_address.as_bytes());
    caller_code.extend_from_slice(&[
        0x61, 0xFF, 0xFF, // PUSH2 0xFFFF (gas)
        0xF1, // CALL
        0x50, // POP (success flag)
        0x60, 0x20, 0x60, 0x00, 0xF3, // RETURN memory[0..32]
    ]);
    let caller_address = Address::repeat_byte(0x01);
    let caller_code = Bytes::from(caller_code);
    state.add_account(caller_address, U256::zero(), caller_code.clone());

    let runtime = Arc::new(Runtime::default());
    let mut evm = Evm::with_tag(
        "lfvm",
        runtime,
        &mut state,
        Environment::with_fork(Fork::Istanbul),
    )
    .unwrap();

    let mut contract = Contract::new(
        caller_address,
        Address::zero(),
        U256::zero(),
        TEST_GAS,
        caller_code,
    );
    let output = evm.run(&mut contract, Bytes::new(), false).unwrap();
    assert_eq!(output.len(), 32);
    assert_eq!(U256::from_big_endian(&output), U256::from(42));
}

#[test]
fn reverting_callee_rolls_back_state_and_reports_failure() {
    let mut state = InMemoryState::new();

    // Callee: SSTORE(1, 1) then REVERT(0, 0).
    let callee_address = Address::repeat_byte(0x02);
    let callee_code = Bytes::from_static(&[
        0x60, 0x01, 0x60, 0x01, 0x55, // PUSH1 1; PUSH1 1; SSTORE
        0x60, 0x00, 0x60, 0x00, 0xFD, // PUSH1 0; PUSH1 0; REVERT
    ]);
    state.add_account(callee_address, U256::zero(), callee_code);

    // Caller: CALL then return the success flag in memory.
    let mut caller_code = vec![
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x73,
    ];
    caller_code.extend_from_slice(callee_address.as_bytes());
    caller_code.extend_from_slice(&[
        0x61, 0xFF, 0xFF, 0xF1, // PUSH2 0xFFFF; CALL
        0x60, 0x00, 0x52, // MSTORE success flag at 0
        0x60, 0x20, 0x60, 0x00, 0xF3, // RETURN memory[0..32]
    ]);
    let caller_address = Address::repeat_byte(0x01);
    let caller_code = Bytes::from(caller_code);
    state.add_account(caller_address, U256::zero(), caller_code.clone());

    let runtime = Arc::new(Runtime::default());
    let mut evm = Evm::with_tag(
        "lfvm",
        runtime,
        &mut state,
        Environment::with_fork(Fork::Istanbul),
    )
    .unwrap();

    let mut contract = Contract::new(
        caller_address,
        Address::zero(),
        U256::zero(),
        TEST_GAS,
        caller_code,
    );
    let output = evm.run(&mut contract, Bytes::new(), false).unwrap();
    assert_eq!(U256::from_big_endian(&output), U256::zero());

    drop(evm);
    assert_eq!(
        state.get_state(callee_address, U256::one()),
        U256::zero(),
        "reverted write must be rolled back"
    );
}

#[test]
fn create_deploys_code_and_bumps_the_nonce() {
    let mut state = InMemoryState::new();

    // Init code returning a single STOP byte as the deployed code:
    // PUSH1 0x00; PUSH1 0; MSTORE8; PUSH1 1; PUSH1 0; RETURN
    // Creator: PUSH init into memory, CREATE(value=0, offset, size), then
    // return the created address.
    let creator_address = Address::repeat_byte(0x0A);
    let creator_code = Bytes::from_static(&[
        // Store init code 0x60006000_53_600160 00_f3 ... simpler: build the
        // 10-byte init in one MSTORE-aligned word.
        0x69, 0x60, 0x00, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xF3, // PUSH10 init
        0x60, 0x00, // PUSH1 0
        0x52, // MSTORE (init right-aligned in word 0)
        0x60, 0x0A, // PUSH1 10 (size)
        0x60, 0x16, // PUSH1 22 (offset = 32 - 10)
        0x60, 0x00, // PUSH1 0 (value)
        0xF0, // CREATE
        0x60, 0x00, 0x52, // MSTORE created address at 0
        0x60, 0x20, 0x60, 0x00, 0xF3, // RETURN memory[0..32]
    ]);
    state.add_account(creator_address, U256::from(1000), creator_code.clone());

    let runtime = Arc::new(Runtime::default());
    let mut evm = Evm::with_tag(
        "lfvm",
        runtime,
        &mut state,
        Environment::with_fork(Fork::Istanbul),
    )
    .unwrap();

    let mut contract = Contract::new(
        creator_address,
        Address::zero(),
        U256::zero(),
        TEST_GAS,
        creator_code,
    );
    let output = evm.run(&mut contract, Bytes::new(), false).unwrap();
    let created = lfvm::utils::word_to_address(U256::from_big_endian(&output));
    assert_ne!(created, Address::zero());

    drop(evm);
    assert_eq!(state.get_nonce(creator_address), 1);
    assert_eq!(state.get_nonce(created), 1);
    assert_eq!(state.get_code(created), Bytes::from_static(&[0x00]));
}

#[test]
fn call_depth_is_limited() {
    let mut state = InMemoryState::new();

    // A contract that calls itself with all available gas and returns the
    // child's success flag. The recursion must bottom out at the depth
    // limit, not overflow anything.
    let address = Address::repeat_byte(0x0D);
    let mut code_bytes = vec![
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x73,
    ];
    code_bytes.extend_from_slice(address.as_bytes());
    code_bytes.extend_from_slice(&[0x5A, 0xF1, 0x00]); // GAS; CALL; STOP
    let code_bytes = Bytes::from(code_bytes);
    state.add_account(address, U256::zero(), code_bytes.clone());

    let runtime = Arc::new(Runtime::default());
    let mut evm = Evm::with_tag(
        "lfvm",
        runtime,
        &mut state,
        Environment::with_fork(Fork::Istanbul),
    )
    .unwrap();

    // The EIP-150 cap shrinks the forwarded gas by 1/64 per level, so this
    // budget bottoms out after a few hundred frames.
    let mut contract = Contract::new(address, Address::zero(), U256::zero(), 100_000, code_bytes);
    let result = evm.run(&mut contract, Bytes::new(), false);
    assert!(result.is_ok());
}

const FIB_CODE_HEX: &str = "608060405234801561001057600080fd5b506004361061002b5760003560e01c8063f9b7c7e514610030575b600080fd5b61004a600480360381019061004591906100f6565b610060565b6040516100579190610132565b60405180910390f35b600060018263ffffffff161161007957600190506100b0565b61008e600283610089919061017c565b610060565b6100a360018461009e919061017c565b610060565b6100ad91906101b4565b90505b919050565b600080fd5b600063ffffffff82169050919050565b6100d3816100ba565b81146100de57600080fd5b50565b6000813590506100f0816100ca565b92915050565b60006020828403121561010c5761010b6100b5565b5b600061011a848285016100e1565b91505092915050565b61012c816100ba565b82525050565b60006020820190506101476000830184610123565b92915050565b7f4e487b7100000000000000000000000000000000000000000000000000000000600052601160045260246000fd5b6000610187826100ba565b9150610192836100ba565b9250828203905063ffffffff8111156101ae576101ad61014d565b5b92915050565b60006101bf826100ba565b91506101ca836100ba565b9250828201905063ffffffff8111156101e6576101e561014d565b5b9291505056fea26469706673582212207fd33e47e97ce5871bb05401e6710238af535ae8aeaab013ca9a9c29152b8a1b64736f6c637827302e382e31372d646576656c6f702e323032322e382e392b636f6d6d69742e62623161386466390058";

fn fib_input(argument: u32) -> Bytes {
    let selector: u32 = 0xF9B7C7E5;
    let mut data = vec![0u8; 4 + 32];
    data[..4].copy_from_slice(&selector.to_be_bytes());
    data[32..36].copy_from_slice(&argument.to_be_bytes());
    Bytes::from(data)
}

fn fib(x: u32) -> u32 {
    if x <= 1 {
        return 1;
    }
    fib(x - 1) + fib(x - 2)
}

#[test]
fn fib_contract_computes_fib_10() {
    let code = Bytes::from(hex::decode(FIB_CODE_HEX).unwrap());

    for tag in ["lfvm", "lfvm-si", "lfvm-dbg"] {
        let (result, _) = run_contract(tag, code.clone(), fib_input(10), Fork::Istanbul);
        let output = result.unwrap();
        assert_eq!(output.len(), 32, "{tag}");
        let got = u32::from_be_bytes(output[28..32].try_into().unwrap());
        assert_eq!(got, fib(10), "{tag}");
        assert_eq!(got, 89, "{tag}");
    }
}

#[test]
fn fib_gas_usage_is_identical_with_and_without_fusion() {
    let code = Bytes::from(hex::decode(FIB_CODE_HEX).unwrap());
    let (_, gas_plain) = run_contract("lfvm", code.clone(), fib_input(8), Fork::Istanbul);
    let (_, gas_fused) = run_contract("lfvm-si", code, fib_input(8), Fork::Istanbul);
    assert_eq!(gas_plain, gas_fused);
}

#[test]
fn unknown_interpreter_tags_are_rejected() {
    let mut state = InMemoryState::new();
    let runtime = Arc::new(Runtime::default());
    assert!(Evm::with_tag("lfvm-jit", runtime, &mut state, Environment::default()).is_none());
}
