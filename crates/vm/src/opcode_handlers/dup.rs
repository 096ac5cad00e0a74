//! `DUP1` .. `DUP16`.

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};

impl CallFrame<'_, '_> {
    /// `n` is 1-indexed: `DUP1` duplicates the top entry.
    pub fn op_dup(&mut self, n: usize) -> Result<OpcodeResult, VmError> {
        self.stack.dup(n);
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
