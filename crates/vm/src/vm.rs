//! The EVM host object: top-level entry, nested calls and creation.
//!
//! The interpreter core executes one frame; everything that spans frames
//! (snapshots, value transfer, the depth limit, contract creation, the
//! observer) lives here. Interpreter variants are selected by tag, as
//! registered by the embedding client: `lfvm`, `lfvm-si`, `lfvm-stats`,
//! `lfvm-si-stats` and `lfvm-dbg`.

use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use lfvm_common::constants::{CALL_DEPTH_LIMIT, MAX_CODE_SIZE};
use lfvm_common::evm::{calculate_create2_address, calculate_create_address};
use lfvm_common::{Address, U256};
use sha3::Keccak256;
use tracing::warn;

use crate::call_frame::{CallFrame, Contract};
use crate::environment::Environment;
use crate::errors::{ExecutionResult, Status, VmError};
use crate::execution_loop;
use crate::gas_cost::CREATE_DATA_GAS;
use crate::instruction::Code;
use crate::memory::Memory;
use crate::observer::{NoopObserver, Observer, StatsObserver};
use crate::runtime::Runtime;
use crate::translator;

/// Deployed code must not start with 0xEF from London on (EIP-3541).
const EOF_PREFIX: u8 = 0xEF;

/// The registered interpreter variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum VmMode {
    #[strum(serialize = "lfvm")]
    Plain,
    #[strum(serialize = "lfvm-si")]
    SuperInstructions,
    #[strum(serialize = "lfvm-stats")]
    Statistics,
    #[strum(serialize = "lfvm-si-stats")]
    SuperInstructionsWithStatistics,
    #[strum(serialize = "lfvm-dbg")]
    Shadow,
}

impl VmMode {
    pub fn config(self) -> VmConfig {
        match self {
            VmMode::Plain => VmConfig::default(),
            VmMode::SuperInstructions => VmConfig {
                super_instructions: true,
                ..Default::default()
            },
            VmMode::Statistics => VmConfig {
                statistics: true,
                ..Default::default()
            },
            VmMode::SuperInstructionsWithStatistics => VmConfig {
                super_instructions: true,
                statistics: true,
                ..Default::default()
            },
            VmMode::Shadow => VmConfig {
                shadow: true,
                ..Default::default()
            },
        }
    }
}

/// All registered factory tags.
pub const VM_MODES: [VmMode; 5] = [
    VmMode::Plain,
    VmMode::SuperInstructions,
    VmMode::Statistics,
    VmMode::SuperInstructionsWithStatistics,
    VmMode::Shadow,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct VmConfig {
    /// Fuse frequent opcode sequences during translation.
    pub super_instructions: bool,
    /// Report every dispatched instruction to the observer.
    pub statistics: bool,
    /// Cross-check each top-level frame against a baseline run.
    pub shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

/// Arguments of a nested call, assembled by the call-family handlers.
pub struct CallParams {
    pub kind: CallKind,
    /// Account whose code runs.
    pub code_address: Address,
    /// Account whose storage and balance the frame sees.
    pub context_address: Address,
    pub caller: Address,
    /// Value visible to the callee via `CALLVALUE`.
    pub value: U256,
    /// Value actually moved (zero for delegate and static calls).
    pub transfer_value: U256,
    pub input: Bytes,
    pub gas: u64,
    pub read_only: bool,
}

/// An EVM instance bound to a world state. One instance executes one
/// top-level frame at a time; nested frames recurse through it.
pub struct Evm<'s> {
    pub runtime: Arc<Runtime>,
    pub state: &'s mut dyn crate::db::WorldState,
    pub env: Environment,
    pub config: VmConfig,
    pub observer: Box<dyn Observer>,
    pub depth: usize,
}

impl<'s> Evm<'s> {
    pub fn new(
        runtime: Arc<Runtime>,
        state: &'s mut dyn crate::db::WorldState,
        env: Environment,
        config: VmConfig,
    ) -> Self {
        let observer: Box<dyn Observer> = if config.statistics {
            Box::new(StatsObserver::new())
        } else {
            Box::new(NoopObserver)
        };
        Self {
            runtime,
            state,
            env,
            config,
            observer,
            depth: 0,
        }
    }

    /// Factory entry: build an interpreter from one of the registered tags.
    pub fn with_tag(
        tag: &str,
        runtime: Arc<Runtime>,
        state: &'s mut dyn crate::db::WorldState,
        env: Environment,
    ) -> Option<Self> {
        let mode = VmMode::from_str(tag).ok()?;
        Some(Self::new(runtime, state, env, mode.config()))
    }

    /// Run `contract` against `input`. Gas is drawn from and returned to
    /// `contract.gas`; the returned bytes are the `RETURN` payload. A revert
    /// surfaces as [`VmError::Reverted`] carrying the revert data, every
    /// other failure as its error value.
    pub fn run(
        &mut self,
        contract: &mut Contract,
        input: Bytes,
        read_only: bool,
    ) -> Result<Bytes, VmError> {
        let result = self.execute(contract, input, read_only);
        match result.status {
            Status::Stopped | Status::Returned | Status::Suicided => Ok(result.output),
            Status::Reverted => Err(VmError::Reverted(result.output)),
            Status::OutOfGas => Err(VmError::OutOfGas),
            _ => Err(result.error.unwrap_or(VmError::InvalidInstruction)),
        }
    }

    /// Like [`Evm::run`], but yielding the full report instead of folding
    /// failures into an error.
    pub fn execute(
        &mut self,
        contract: &mut Contract,
        input: Bytes,
        read_only: bool,
    ) -> ExecutionResult {
        let code = match self.runtime.translate(
            contract.address,
            &contract.code,
            self.config.super_instructions,
            false,
        ) {
            Ok(code) => code,
            Err(err) => {
                contract.gas = 0;
                return ExecutionResult {
                    status: Status::Error,
                    output: Bytes::new(),
                    gas_left: 0,
                    error: Some(err.into()),
                };
            }
        };

        let shadow = self
            .config
            .shadow
            .then(|| self.run_shadow(contract, &input, read_only));

        let result = self.interpret(code, contract.clone(), input, read_only);
        contract.gas = result.gas_left;

        if let Some(Some(baseline)) = shadow {
            if baseline.status != result.status
                || baseline.gas_left != result.gas_left
                || baseline.output != result.output
            {
                warn!(
                    address = %contract.address,
                    baseline_status = %baseline.status,
                    status = %result.status,
                    baseline_gas = baseline.gas_left,
                    gas = result.gas_left,
                    "shadow run diverged from long-form execution"
                );
            }
        }

        self.observer.finish();
        result
    }

    /// Execute the frame once on a snapshot with the baseline configuration
    /// (no super-instructions, translation cache bypassed), then roll the
    /// state back. Used by `lfvm-dbg` to cross-check observable behavior.
    fn run_shadow(
        &mut self,
        contract: &Contract,
        input: &Bytes,
        read_only: bool,
    ) -> Option<ExecutionResult> {
        let code = match translator::translate(&contract.code, false) {
            Ok(code) => Arc::new(code),
            Err(_) => return None,
        };
        let snapshot = self.state.snapshot();
        let result = self.interpret(code, contract.clone(), input.clone(), read_only);
        self.state.revert_to_snapshot(snapshot);
        Some(result)
    }

    /// Drive one frame to a terminal status. The pooled stack is returned on
    /// every exit path when the frame drops. An exceptional halt consumes
    /// all gas of the frame; a revert only what was spent.
    pub(crate) fn interpret(
        &mut self,
        code: Arc<Code>,
        contract: Contract,
        input: Bytes,
        read_only: bool,
    ) -> ExecutionResult {
        let fork = self.env.fork;
        let stack = self.runtime.acquire_stack();
        let mut frame = CallFrame {
            code,
            data: input,
            stack,
            memory: Memory::new(),
            contract,
            read_only,
            pc: 0,
            status: Status::Running,
            err: None,
            result_offset: 0,
            result_size: 0,
            return_data: Bytes::new(),
            hasher: Keccak256::default(),
            is_berlin: fork.is_berlin(),
            is_london: fork.is_london(),
            evm: self,
        };

        execution_loop::run(&mut frame);

        let output = match frame.status {
            Status::Returned | Status::Reverted if frame.result_size > 0 => Bytes::copy_from_slice(
                frame.memory.slice(frame.result_offset, frame.result_size),
            ),
            _ => Bytes::new(),
        };
        let gas_left = match frame.status {
            Status::Stopped | Status::Returned | Status::Suicided | Status::Reverted => {
                frame.contract.gas
            }
            _ => 0,
        };
        ExecutionResult {
            status: frame.status,
            output,
            gas_left,
            error: frame.err,
        }
    }

    /// Execute a nested call on behalf of a frame. Owns the snapshot, the
    /// value transfer and the depth limit; on failure the snapshot is rolled
    /// back and (except for reverts, which keep their leftover gas) the
    /// forwarded gas is consumed.
    pub(crate) fn call_contract(&mut self, params: CallParams) -> ExecutionResult {
        if self.depth >= CALL_DEPTH_LIMIT {
            return failure(params.gas);
        }
        if !params.transfer_value.is_zero()
            && self.state.get_balance(params.caller) < params.transfer_value
        {
            return failure(params.gas);
        }

        let snapshot = self.state.snapshot();

        if params.kind == CallKind::Call && !params.transfer_value.is_zero() {
            self.state.sub_balance(params.caller, params.transfer_value);
            self.state
                .add_balance(params.context_address, params.transfer_value);
        }

        let code = self.state.get_code(params.code_address);
        if code.is_empty() {
            // Nothing to run; the transfer (if any) stands.
            return ExecutionResult {
                status: Status::Stopped,
                output: Bytes::new(),
                gas_left: params.gas,
                error: None,
            };
        }

        let translated = match self.runtime.translate(
            params.code_address,
            &code,
            self.config.super_instructions,
            false,
        ) {
            Ok(translated) => translated,
            Err(err) => {
                self.state.revert_to_snapshot(snapshot);
                return ExecutionResult {
                    status: Status::Error,
                    output: Bytes::new(),
                    gas_left: 0,
                    error: Some(err.into()),
                };
            }
        };

        let contract = Contract::new(
            params.context_address,
            params.caller,
            params.value,
            params.gas,
            code,
        );

        self.depth += 1;
        let result = self.interpret(translated, contract, params.input, params.read_only);
        self.depth -= 1;

        match result.status {
            Status::Stopped | Status::Returned | Status::Suicided => result,
            Status::Reverted => {
                self.state.revert_to_snapshot(snapshot);
                result
            }
            _ => {
                self.state.revert_to_snapshot(snapshot);
                ExecutionResult {
                    gas_left: 0,
                    ..result
                }
            }
        }
    }

    /// Execute contract creation on behalf of a frame. Returns the frame
    /// result plus the created address on success.
    pub(crate) fn create_contract(
        &mut self,
        caller: Address,
        value: U256,
        init_code: Bytes,
        gas: u64,
        salt: Option<U256>,
    ) -> (ExecutionResult, Option<Address>) {
        if self.depth >= CALL_DEPTH_LIMIT {
            return (failure(gas), None);
        }
        if !value.is_zero() && self.state.get_balance(caller) < value {
            return (failure(gas), None);
        }

        let nonce = self.state.get_nonce(caller);
        let address = match salt {
            Some(salt) => calculate_create2_address(caller, salt, &init_code),
            None => calculate_create_address(caller, nonce),
        };
        // The caller's nonce moves even when the creation fails below.
        self.state.set_nonce(caller, nonce + 1);

        // Address collision: an account with code or nonce already lives
        // there.
        if self.state.get_nonce(address) != 0 || self.state.get_code_size(address) != 0 {
            return (failure_consuming_gas(), None);
        }

        let snapshot = self.state.snapshot();
        self.state.set_nonce(address, 1);
        if !value.is_zero() {
            self.state.sub_balance(caller, value);
            self.state.add_balance(address, value);
        }

        // Creation mode: translate outside the cache, both read and write.
        let translated = match self
            .runtime
            .translate(address, &init_code, self.config.super_instructions, true)
        {
            Ok(translated) => translated,
            Err(err) => {
                self.state.revert_to_snapshot(snapshot);
                return (
                    ExecutionResult {
                        status: Status::Error,
                        output: Bytes::new(),
                        gas_left: 0,
                        error: Some(err.into()),
                    },
                    None,
                );
            }
        };

        let contract = Contract::new(address, caller, value, gas, init_code);

        self.depth += 1;
        let mut result = self.interpret(translated, contract, Bytes::new(), false);
        self.depth -= 1;

        match result.status {
            Status::Stopped | Status::Returned => {
                let deployed = std::mem::take(&mut result.output);
                let deposit_cost = deployed.len() as u64 * CREATE_DATA_GAS;
                let invalid_prefix =
                    self.env.fork.is_london() && deployed.first() == Some(&EOF_PREFIX);
                if deployed.len() > MAX_CODE_SIZE
                    || invalid_prefix
                    || result.gas_left < deposit_cost
                {
                    self.state.revert_to_snapshot(snapshot);
                    return (failure_consuming_gas(), None);
                }
                result.gas_left -= deposit_cost;
                self.state.set_code(address, deployed);
                result.status = Status::Stopped;
                (result, Some(address))
            }
            Status::Reverted => {
                self.state.revert_to_snapshot(snapshot);
                (result, None)
            }
            _ => {
                self.state.revert_to_snapshot(snapshot);
                (
                    ExecutionResult {
                        gas_left: 0,
                        ..result
                    },
                    None,
                )
            }
        }
    }
}

/// A call that failed before running any code: the forwarded gas is handed
/// back untouched.
fn failure(gas: u64) -> ExecutionResult {
    ExecutionResult {
        status: Status::Error,
        output: Bytes::new(),
        gas_left: gas,
        error: None,
    }
}

/// A failure that eats the forwarded gas.
fn failure_consuming_gas() -> ExecutionResult {
    ExecutionResult {
        status: Status::Error,
        output: Bytes::new(),
        gas_left: 0,
        error: None,
    }
}
