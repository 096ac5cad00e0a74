//! Contract-address derivation for the create opcodes.

use crate::types::{Address, H256, U256};
use keccak_hash::keccak;

/// Address of a contract created by `CREATE`: the rightmost 20 bytes of
/// `keccak(rlp([sender, nonce]))`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let nonce_bytes = rlp_integer(nonce);
    let mut payload = Vec::with_capacity(22 + nonce_bytes.len());
    payload.push(0x80 + 20);
    payload.extend_from_slice(sender.as_bytes());
    payload.extend_from_slice(&nonce_bytes);

    let mut encoded = Vec::with_capacity(1 + payload.len());
    encoded.push(0xc0 + payload.len() as u8);
    encoded.extend_from_slice(&payload);

    address_from_hash(keccak(&encoded))
}

/// Address of a contract created by `CREATE2`: the rightmost 20 bytes of
/// `keccak(0xff ++ sender ++ salt ++ keccak(init_code))`.
pub fn calculate_create2_address(sender: Address, salt: U256, init_code: &[u8]) -> Address {
    let salt_bytes = salt.to_big_endian();

    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(&salt_bytes);
    preimage.extend_from_slice(keccak(init_code).as_bytes());

    address_from_hash(keccak(&preimage))
}

fn address_from_hash(hash: H256) -> Address {
    Address::from_slice(&hash.as_bytes()[12..])
}

// RLP of an unsigned integer: empty string for zero, single byte below 0x80,
// length-prefixed minimal big-endian bytes otherwise. The nonce payload never
// reaches the long-form (>55 byte) encoding.
fn rlp_integer(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0x80];
    }
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(7);
    let minimal = &bytes[first..];
    if minimal.len() == 1 && minimal[0] < 0x80 {
        return minimal.to_vec();
    }
    let mut out = Vec::with_capacity(1 + minimal.len());
    out.push(0x80 + minimal.len() as u8);
    out.extend_from_slice(minimal);
    out
}
