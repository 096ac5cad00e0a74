//! Shared builders for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use lfvm::call_frame::{CallFrame, Contract};
use lfvm::db::InMemoryState;
use lfvm::environment::Environment;
use lfvm::errors::Status;
use lfvm::execution_loop;
use lfvm::instruction::{Code, Instruction};
use lfvm::memory::Memory;
use lfvm::runtime::Runtime;
use lfvm::vm::{Evm, VmConfig};
use lfvm_common::{Address, Fork, U256};

pub const TEST_GAS: u64 = 1 << 31;

/// Outcome of driving a hand-built frame.
pub struct FrameOutcome {
    pub status: Status,
    pub gas_left: u64,
    pub pc: usize,
    pub stack: Vec<U256>,
    pub refund: u64,
}

/// Run a raw instruction sequence against a fresh in-memory state, the way
/// the interpreter sees it after translation. `stack_seed` pre-populates the
/// stack with zeroes to probe boundary checks.
pub fn run_instructions(
    instructions: Vec<Instruction>,
    stack_seed: usize,
    fork: Fork,
    read_only: bool,
) -> FrameOutcome {
    let mut state = InMemoryState::new();
    run_instructions_with_state(instructions, stack_seed, fork, read_only, TEST_GAS, &mut state)
}

pub fn run_instructions_with_state(
    instructions: Vec<Instruction>,
    stack_seed: usize,
    fork: Fork,
    read_only: bool,
    gas: u64,
    state: &mut InMemoryState,
) -> FrameOutcome {
    let runtime = Arc::new(Runtime::default());
    let outcome = {
        let mut evm = Evm::new(
            Arc::clone(&runtime),
            state,
            Environment::with_fork(fork),
            VmConfig::default(),
        );

        let mut frame = CallFrame {
            code: Arc::new(Code(instructions)),
            data: Bytes::new(),
            stack: runtime.acquire_stack(),
            memory: Memory::new(),
            contract: Contract::new(
                Address::zero(),
                Address::zero(),
                U256::zero(),
                gas,
                Bytes::new(),
            ),
            read_only,
            pc: 0,
            status: Status::Running,
            err: None,
            result_offset: 0,
            result_size: 0,
            return_data: Bytes::new(),
            hasher: Default::default(),
            is_berlin: fork.is_berlin(),
            is_london: fork.is_london(),
            evm: &mut evm,
        };
        frame.stack.set_stack_ptr(stack_seed);

        execution_loop::run(&mut frame);

        FrameOutcome {
            status: frame.status,
            gas_left: frame.contract.gas,
            pc: frame.pc,
            stack: frame.stack.data().to_vec(),
            refund: 0,
        }
    };

    use lfvm::db::WorldState;
    FrameOutcome {
        refund: state.get_refund(),
        ..outcome
    }
}

/// An EVM over a fresh state with one deployed contract, driven through the
/// public entry point.
pub fn run_contract(
    tag: &str,
    code: Bytes,
    input: Bytes,
    fork: Fork,
) -> (Result<Bytes, lfvm::errors::VmError>, u64) {
    let mut state = InMemoryState::new();
    let contract_address = Address::repeat_byte(0xC0);
    state.add_account(contract_address, U256::zero(), code.clone());

    let runtime = Arc::new(Runtime::default());
    let mut evm = Evm::with_tag(
        tag,
        runtime,
        &mut state,
        Environment::with_fork(fork),
    )
    .expect("unknown interpreter tag");

    let mut contract = Contract::new(
        contract_address,
        Address::zero(),
        U256::zero(),
        TEST_GAS,
        code,
    );
    let result = evm.run(&mut contract, input, true);
    (result, contract.gas)
}
