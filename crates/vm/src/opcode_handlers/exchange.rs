//! `SWAP1` .. `SWAP16`.

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};

impl CallFrame<'_, '_> {
    /// `n` is 1-indexed: `SWAP1` exchanges the top two entries.
    pub fn op_swap(&mut self, n: usize) -> Result<OpcodeResult, VmError> {
        self.stack.swap(n);
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
