//! Small shared helpers.

use lfvm_common::{Address, U256};

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_big_endian()[12..])
}

/// `size` bytes of `data` starting at `offset`, zero-filled past the end.
/// Offsets beyond the buffer yield all zeroes.
pub fn right_padded_slice(data: &[u8], offset: U256, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    if offset.bits() <= 64 {
        let offset = offset.as_u64() as usize;
        if offset < data.len() {
            let available = (data.len() - offset).min(size);
            out[..available].copy_from_slice(&data[offset..offset + available]);
        }
    }
    out
}
