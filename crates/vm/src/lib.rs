//! # LFVM - a long-form EVM interpreter
//!
//! LFVM executes EVM bytecode in two stages. A one-time **translator**
//! rewrites the stack-machine bytecode into a flat stream of fixed-width
//! instructions - each an `(opcode, 16-bit argument)` pair - optionally
//! fusing frequent opcode sequences into super-instructions. The
//! **interpreter** then dispatches that stream against an execution context
//! of evaluation stack, scratch memory, gas meter and a host-supplied
//! world-state facade.
//!
//! ## Architecture
//!
//! ```text
//! bytecode ──► Translator ──► Code (long-form) ──► Interpreter
//!                  │                                   │
//!          TranslationCache                 CallFrame: Stack / Memory /
//!            (per Runtime)                  gas counter / status
//!                                                      │
//!                                               WorldState facade
//! ```
//!
//! ## Key components
//!
//! - [`translator`]: bytecode conversion with the jump-target alignment
//!   invariant, backed by a process-wide cache
//! - [`vm::Evm`]: execution entry point, nested calls and creation
//! - [`call_frame::CallFrame`]: per-invocation execution context
//! - [`stack`] / [`memory`] / [`hash_cache`]: pooled stacks, word-granular
//!   memory, keccak LRU
//! - [`db::WorldState`]: the narrow interface to the host's state database
//!
//! ## Supported forks
//!
//! Istanbul through London. Post-Shanghai features are out of scope, as are
//! precompiled contracts (supplied by the host).
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use lfvm::call_frame::Contract;
//! use lfvm::db::InMemoryState;
//! use lfvm::environment::Environment;
//! use lfvm::runtime::Runtime;
//! use lfvm::vm::Evm;
//! use lfvm_common::{Address, U256};
//!
//! let runtime = Arc::new(Runtime::default());
//! let mut state = InMemoryState::new();
//! let mut evm = Evm::with_tag("lfvm-si", runtime, &mut state, Environment::default()).unwrap();
//!
//! let code = Bytes::from_static(&[0x60, 0x01, 0x50, 0x00]); // PUSH1 1; POP; STOP
//! let mut contract = Contract::new(Address::zero(), Address::zero(), U256::zero(), 100_000, code);
//! let output = evm.run(&mut contract, Bytes::new(), false).unwrap();
//! assert!(output.is_empty());
//! ```

pub mod call_frame;
pub mod db;
pub mod environment;
pub mod errors;
pub mod execution_loop;
pub mod gas_cost;
pub mod hash_cache;
pub mod instruction;
pub mod memory;
pub mod observer;
pub mod opcode_handlers;
pub mod opcodes;
pub mod runtime;
pub mod stack;
pub mod translator;
pub mod utils;
pub mod vm;

pub use call_frame::{CallFrame, Contract};
pub use environment::Environment;
pub use errors::{ExecutionResult, Status, TranslationError, VmError};
pub use instruction::{Code, Instruction};
pub use opcodes::OpCode;
pub use runtime::{Runtime, RuntimeConfig};
pub use translator::translate;
pub use vm::{Evm, VmConfig, VmMode, VM_MODES};
