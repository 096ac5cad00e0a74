//! Comparison and bit-pattern operations: `LT`, `GT`, `SLT`, `SGT`, `EQ`,
//! `ISZERO`, `AND`, `OR`, `XOR`, `NOT`, `BYTE`, `SHL`, `SHR`, `SAR`.

use lfvm_common::U256;

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};

const CONTINUE: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

fn bool_to_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Signed less-than over two's-complement words. For operands of equal
/// sign the unsigned order coincides with the signed one.
pub(crate) fn signed_lt(a: &U256, b: &U256) -> bool {
    match (a.bit(255), b.bit(255)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

impl CallFrame<'_, '_> {
    pub fn op_lt(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = bool_to_word(a < *b);
        CONTINUE
    }

    pub fn op_gt(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = bool_to_word(a > *b);
        CONTINUE
    }

    pub fn op_slt(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = bool_to_word(signed_lt(&a, b));
        CONTINUE
    }

    pub fn op_sgt(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = bool_to_word(signed_lt(b, &a));
        CONTINUE
    }

    pub fn op_eq(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = bool_to_word(a == *b);
        CONTINUE
    }

    pub fn op_iszero(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.peek();
        *a = bool_to_word(a.is_zero());
        CONTINUE
    }

    pub fn op_and(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a & *b;
        CONTINUE
    }

    pub fn op_or(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a | *b;
        CONTINUE
    }

    pub fn op_xor(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a ^ *b;
        CONTINUE
    }

    pub fn op_not(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.peek();
        *a = !*a;
        CONTINUE
    }

    pub fn op_byte(&mut self) -> Result<OpcodeResult, VmError> {
        let index = self.stack.pop();
        let value = self.stack.peek();
        *value = if index < U256::from(32) {
            // `byte(0)` is the least significant byte.
            U256::from(value.byte(31 - index.as_usize()))
        } else {
            U256::zero()
        };
        CONTINUE
    }

    pub fn op_shl(&mut self) -> Result<OpcodeResult, VmError> {
        let shift = self.stack.pop();
        let value = self.stack.peek();
        *value = if shift < U256::from(256) {
            *value << shift.as_usize()
        } else {
            U256::zero()
        };
        CONTINUE
    }

    pub fn op_shr(&mut self) -> Result<OpcodeResult, VmError> {
        let shift = self.stack.pop();
        let value = self.stack.peek();
        *value = if shift < U256::from(256) {
            *value >> shift.as_usize()
        } else {
            U256::zero()
        };
        CONTINUE
    }

    pub fn op_sar(&mut self) -> Result<OpcodeResult, VmError> {
        let shift = self.stack.pop();
        let value = self.stack.peek();
        let negative = value.bit(255);
        *value = if shift >= U256::from(256) {
            if negative {
                U256::MAX
            } else {
                U256::zero()
            }
        } else {
            let shift = shift.as_usize();
            let mut shifted = *value >> shift;
            if negative && shift > 0 {
                shifted = shifted | (U256::MAX << (256 - shift));
            }
            shifted
        };
        CONTINUE
    }
}
