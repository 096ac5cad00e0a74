//! Byte-addressable scratch memory.
//!
//! Memory is logically extended to the next multiple of 32 bytes whenever
//! touched; the extension charges the quadratic EVM memory-gas delta against
//! the frame's gas counter before any bytes are written. Extended bytes are
//! zero-initialized.

use crate::errors::VmError;
use lfvm_common::constants::WORD_SIZE_IN_BYTES_U64;
use lfvm_common::U256;

const MEMORY_EXPANSION_QUOTIENT: u128 = 512;
const MEMORY_GAS_PER_WORD: u128 = 3;

#[derive(Debug, Default)]
pub struct Memory {
    store: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes; always a multiple of 32.
    pub fn size(&self) -> u64 {
        self.store.len() as u64
    }

    /// Ensure the memory covers `offset + size` bytes, rounded up to a
    /// 32-byte word, charging the expansion delta against `gas`. A zero
    /// `size` never grows and never charges.
    pub fn grow(&mut self, gas: &mut u64, offset: u64, size: u64) -> Result<(), VmError> {
        if size == 0 {
            return Ok(());
        }
        let end = offset.checked_add(size).ok_or(VmError::OutOfGas)?;
        let new_size = end
            .checked_next_multiple_of(WORD_SIZE_IN_BYTES_U64)
            .ok_or(VmError::OutOfGas)?;
        if new_size <= self.size() {
            return Ok(());
        }

        let fee = expansion_cost(new_size, self.size())?;
        if *gas < fee {
            return Err(VmError::OutOfGas);
        }
        *gas -= fee;

        self.store.resize(new_size as usize, 0);
        Ok(())
    }

    /// Read `size` bytes starting at `offset`, growing (and charging) first.
    pub fn load(&mut self, gas: &mut u64, offset: u64, size: u64) -> Result<Vec<u8>, VmError> {
        self.grow(gas, offset, size)?;
        Ok(self.slice(offset, size).to_vec())
    }

    /// Read one 256-bit word.
    pub fn load_word(&mut self, gas: &mut u64, offset: u64) -> Result<U256, VmError> {
        self.grow(gas, offset, WORD_SIZE_IN_BYTES_U64)?;
        Ok(U256::from_big_endian(
            self.slice(offset, WORD_SIZE_IN_BYTES_U64),
        ))
    }

    /// A view of already grown memory. Callers must have grown the region.
    pub fn slice(&self, offset: u64, size: u64) -> &[u8] {
        if size == 0 {
            return &[];
        }
        &self.store[offset as usize..(offset + size) as usize]
    }

    pub fn store(&mut self, gas: &mut u64, offset: u64, data: &[u8]) -> Result<(), VmError> {
        self.grow(gas, offset, data.len() as u64)?;
        if !data.is_empty() {
            let offset = offset as usize;
            self.store[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    pub fn store_word(&mut self, gas: &mut u64, offset: u64, value: U256) -> Result<(), VmError> {
        self.store(gas, offset, &value.to_big_endian())
    }

    pub fn store_byte(&mut self, gas: &mut u64, offset: u64, value: u8) -> Result<(), VmError> {
        self.store(gas, offset, &[value])
    }

    /// Copy memory contents starting at `offset` into `dst`, zero-filling
    /// whatever lies beyond the current size. Does not grow.
    pub fn copy_data(&self, offset: u64, dst: &mut [u8]) {
        let size = self.size();
        if offset >= size {
            dst.fill(0);
            return;
        }
        let available = ((size - offset) as usize).min(dst.len());
        dst[..available].copy_from_slice(&self.store[offset as usize..offset as usize + available]);
        dst[available..].fill(0);
    }
}

/// Gas to extend memory from `current_size` to `new_size` bytes, both
/// word-aligned: the difference of the total costs `3w + w²/512`.
pub fn expansion_cost(new_size: u64, current_size: u64) -> Result<u64, VmError> {
    if new_size <= current_size {
        return Ok(0);
    }
    let cost = total_cost(new_size)? - total_cost(current_size)?;
    u64::try_from(cost).map_err(|_| VmError::OutOfGas)
}

fn total_cost(size: u64) -> Result<u128, VmError> {
    let words = (size as u128).div_ceil(WORD_SIZE_IN_BYTES_U64 as u128);
    Ok(MEMORY_GAS_PER_WORD * words + words * words / MEMORY_EXPANSION_QUOTIENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_stays_word_aligned() {
        let mut memory = Memory::new();
        let mut gas = 1_000_000u64;
        memory.store(&mut gas, 0, &[1, 2, 3]).unwrap();
        assert_eq!(memory.size(), 32);
        memory.store_byte(&mut gas, 33, 0xFF).unwrap();
        assert_eq!(memory.size(), 64);
    }

    #[test]
    fn expansion_charges_the_quadratic_delta() {
        // One word: 3, two words: 6; the 512 quotient only bites later.
        assert_eq!(expansion_cost(32, 0).unwrap(), 3);
        assert_eq!(expansion_cost(64, 32).unwrap(), 3);
        // 32 KiB = 1024 words: 3*1024 + 1024^2/512 = 5120.
        assert_eq!(expansion_cost(32 * 1024, 0).unwrap(), 5120);
    }

    #[test]
    fn growth_fails_without_gas() {
        let mut memory = Memory::new();
        let mut gas = 2u64;
        let err = memory.grow(&mut gas, 0, 32).unwrap_err();
        assert_eq!(err, VmError::OutOfGas);
        assert_eq!(gas, 2);
        assert_eq!(memory.size(), 0);
    }

    #[test]
    fn copy_data_zero_fills_beyond_size() {
        let mut memory = Memory::new();
        let mut gas = 1_000u64;
        memory.store(&mut gas, 0, &[0xAA; 8]).unwrap();
        let mut out = [0xFFu8; 40];
        memory.copy_data(0, &mut out);
        assert_eq!(&out[..8], &[0xAA; 8]);
        assert!(out[8..].iter().all(|b| *b == 0));
    }
}
