//! Arithmetic operations: `ADD`, `MUL`, `SUB`, `DIV`, `SDIV`, `MOD`,
//! `SMOD`, `ADDMOD`, `MULMOD`, `EXP`, `SIGNEXTEND`.

use lfvm_common::{U256, U512};

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};
use crate::gas_cost;

const CONTINUE: Result<OpcodeResult, VmError> = Ok(OpcodeResult::Continue { pc_increment: 1 });

/// Two's-complement negation.
fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

impl CallFrame<'_, '_> {
    pub fn op_add(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a.overflowing_add(*b).0;
        CONTINUE
    }

    pub fn op_mul(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a.overflowing_mul(*b).0;
        CONTINUE
    }

    pub fn op_sub(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a.overflowing_sub(*b).0;
        CONTINUE
    }

    pub fn op_div(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a.checked_div(*b).unwrap_or_default();
        CONTINUE
    }

    pub fn op_sdiv(&mut self) -> Result<OpcodeResult, VmError> {
        let mut a = self.stack.pop();
        let b = self.stack.peek();
        let mut divisor = *b;

        let mut negative = false;
        if a.bit(255) {
            a = negate(a);
            negative = !negative;
        }
        if divisor.bit(255) {
            divisor = negate(divisor);
            negative = !negative;
        }

        *b = match a.checked_div(divisor) {
            Some(quotient) if negative => negate(quotient),
            Some(quotient) => quotient,
            None => U256::zero(),
        };
        CONTINUE
    }

    pub fn op_mod(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.peek();
        *b = a.checked_rem(*b).unwrap_or_default();
        CONTINUE
    }

    pub fn op_smod(&mut self) -> Result<OpcodeResult, VmError> {
        let mut a = self.stack.pop();
        let b = self.stack.peek();
        let mut modulus = *b;

        // The result takes the sign of the dividend.
        let negative = a.bit(255);
        if negative {
            a = negate(a);
        }
        if modulus.bit(255) {
            modulus = negate(modulus);
        }

        *b = match a.checked_rem(modulus) {
            Some(remainder) if negative => negate(remainder),
            Some(remainder) => remainder,
            None => U256::zero(),
        };
        CONTINUE
    }

    pub fn op_addmod(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.pop();
        let modulus = self.stack.peek();
        *modulus = if modulus.is_zero() {
            U256::zero()
        } else {
            let sum = U512::from(a) + U512::from(b);
            let rem = sum % U512::from(*modulus);
            U256([rem.0[0], rem.0[1], rem.0[2], rem.0[3]])
        };
        CONTINUE
    }

    pub fn op_mulmod(&mut self) -> Result<OpcodeResult, VmError> {
        let a = self.stack.pop();
        let b = self.stack.pop();
        let modulus = self.stack.peek();
        *modulus = if modulus.is_zero() {
            U256::zero()
        } else {
            let product = a.full_mul(b);
            let rem = product % U512::from(*modulus);
            U256([rem.0[0], rem.0[1], rem.0[2], rem.0[3]])
        };
        CONTINUE
    }

    pub fn op_exp(&mut self) -> Result<OpcodeResult, VmError> {
        let base = self.stack.pop();
        let exponent = *self.stack.peek();
        self.use_gas(gas_cost::exp_cost(exponent))?;

        *self.stack.peek() = base.overflowing_pow(exponent).0;
        CONTINUE
    }

    pub fn op_signextend(&mut self) -> Result<OpcodeResult, VmError> {
        let index = self.stack.pop();
        let value = self.stack.peek();

        if index < U256::from(31) {
            let x = index.as_usize();
            let sign_bit = 8 * x + 7;
            let mask = (U256::one() << (8 * (x + 1))) - 1;
            *value = if value.bit(sign_bit) {
                *value | !mask
            } else {
                *value & mask
            };
        }
        CONTINUE
    }
}
