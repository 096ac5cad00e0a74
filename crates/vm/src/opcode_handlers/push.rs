//! `PUSH1` .. `PUSH32`.
//!
//! A push occupies `⌈n/2⌉` instruction slots: the push itself carries the
//! first two immediate bytes, `DATA` entries carry the rest, an odd trailing
//! byte sitting in the high half of its slot.

use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};

impl CallFrame<'_, '_> {
    pub fn op_push(&mut self, n: usize) -> Result<OpcodeResult, VmError> {
        let slots = n.div_ceil(2);
        let mut buffer = [0u8; 32];
        for slot in 0..slots {
            let instruction = self
                .code
                .get(self.pc + slot)
                .ok_or(VmError::InvalidInstruction)?;
            buffer[2 * slot] = (instruction.arg >> 8) as u8;
            buffer[2 * slot + 1] = instruction.arg as u8;
        }

        self.stack.push(U256::from_big_endian(&buffer[..n]));
        Ok(OpcodeResult::Continue { pc_increment: slots })
    }
}
