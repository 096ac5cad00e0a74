//! Error and outcome types.
//!
//! A frame never unwinds: every failure is folded into a terminal
//! [`Status`] plus an optional [`VmError`] detail on the frame. Errors only
//! appear as `Result`s on the public entry points and inside the translator.

use bytes::Bytes;
use serde::Serialize;

/// Execution state of a frame. `Running` is the only non-terminal state;
/// the dispatch loop exits as soon as the status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum Status {
    Running,
    Stopped,
    Returned,
    Reverted,
    Suicided,
    OutOfGas,
    Error,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        *self != Status::Running
    }
}

/// Failures surfaced while rewriting EVM bytecode into long-form code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("jump target at byte {0} lies inside an already emitted block")]
    TargetBlockOverrun(usize),
    #[error("PC at byte position {0} exceeds the 16-bit argument range")]
    PcOutOfRange(usize),
}

/// Frame-local failure detail. Mapped onto a terminal [`Status`] by the
/// dispatch loop; only `Reverted` ever crosses the public API boundary as an
/// `Err`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid jump destination")]
    InvalidJump,
    #[error("invalid instruction")]
    InvalidInstruction,
    #[error("instruction stream corrupted: data reached the dispatcher")]
    UnexpectedDataInstruction,
    #[error("write protection")]
    WriteProtection,
    #[error("return data access out of bounds")]
    ReturnDataOutOfBounds,
    #[error("execution reverted")]
    Reverted(Bytes),
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl VmError {
    /// The terminal status this failure resolves to.
    pub fn status(&self) -> Status {
        match self {
            VmError::OutOfGas => Status::OutOfGas,
            VmError::Reverted(_) => Status::Reverted,
            _ => Status::Error,
        }
    }
}

/// Outcome of one opcode dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    /// Keep running; advance `pc` by `pc_increment` (zero when the handler
    /// repositioned `pc` itself).
    Continue { pc_increment: usize },
    /// The handler assigned a terminal status.
    Halt,
}

/// Result of a completed top-level frame.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub status: Status,
    /// Memory slice surfaced by `RETURN` or `REVERT`; empty otherwise.
    pub output: Bytes,
    /// Gas remaining on the contract after the frame halted.
    pub gas_left: u64,
    #[serde(skip)]
    pub error: Option<VmError>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            Status::Stopped | Status::Returned | Status::Suicided
        )
    }
}
