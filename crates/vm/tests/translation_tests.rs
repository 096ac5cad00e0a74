//! Translator behavior: jump-target alignment, push packing, pattern
//! fusion, and the translation cache.

use std::sync::Arc;

use bytes::Bytes;
use lfvm::errors::TranslationError;
use lfvm::instruction::Instruction;
use lfvm::opcodes::OpCode;
use lfvm::runtime::Runtime;
use lfvm::translate;
use lfvm::translator::MUTABLE_CONTRACT_ADDRESSES;
use lfvm_common::Address;

fn instr(opcode: OpCode, arg: u16) -> Instruction {
    Instruction::new(opcode, arg)
}

#[test]
fn empty_code_translates_to_nothing() {
    let code = translate(&[], false).unwrap();
    assert!(code.is_empty());
}

#[test]
fn push1_add_fuses_only_with_super_instructions() {
    // PUSH1 0x05; ADD with one byte of live code behind it.
    let source = [0x60, 0x05, 0x01];

    let fused = translate(&source, true).unwrap();
    assert_eq!(fused.0, vec![instr(OpCode::PUSH1_ADD, 0x0005)]);

    let plain = translate(&source, false).unwrap();
    assert_eq!(
        plain.0,
        vec![instr(OpCode::PUSH1, 0x0500), instr(OpCode::ADD, 0)]
    );
}

#[test]
fn push_immediates_pack_two_bytes_per_slot() {
    // PUSH3 0xAABBCC; STOP
    let source = [0x62, 0xAA, 0xBB, 0xCC, 0x00];
    let code = translate(&source, false).unwrap();
    assert_eq!(
        code.0,
        vec![
            instr(OpCode::PUSH3, 0xAABB),
            instr(OpCode::DATA, 0xCC00),
            instr(OpCode::STOP, 0),
        ]
    );
}

#[test]
fn push32_occupies_sixteen_slots() {
    let mut source = vec![0x7F];
    source.extend_from_slice(&[0x11; 32]);
    source.push(0x00); // STOP
    let code = translate(&source, false).unwrap();
    assert_eq!(code.len(), 17);
    assert_eq!(code[0], instr(OpCode::PUSH32, 0x1111));
    for slot in 1..16 {
        assert_eq!(code[slot], instr(OpCode::DATA, 0x1111));
    }
    assert_eq!(code[16].opcode, OpCode::STOP);
}

#[test]
fn truncated_push_marks_a_data_segment() {
    // PUSH2 with a single immediate byte left.
    let code = translate(&[0x61, 0xAA], false).unwrap();
    assert_eq!(code.0, vec![instr(OpCode::INVALID, 0)]);

    // A push whose immediate runs exactly to the end of the code is data
    // too; live code always has an instruction behind the push.
    let code = translate(&[0x60, 0x01], false).unwrap();
    assert_eq!(code.0, vec![instr(OpCode::INVALID, 0)]);
}

#[test]
fn jumpdest_is_pinned_to_its_byte_offset() {
    // PUSH1 0; PUSH1 0; JUMPDEST(at byte 4); STOP
    let source = [0x60, 0x00, 0x60, 0x00, 0x5B, 0x00];

    let plain = translate(&source, false).unwrap();
    assert_eq!(
        plain.0,
        vec![
            instr(OpCode::PUSH1, 0x0000),
            instr(OpCode::PUSH1, 0x0000),
            instr(OpCode::JUMP_TO, 4),
            instr(OpCode::NOOP, 0),
            instr(OpCode::JUMPDEST, 0),
            instr(OpCode::STOP, 0),
        ]
    );
    assert_eq!(plain[4].opcode, OpCode::JUMPDEST);

    // With fusion the gap is wider but the destination index is unchanged.
    let fused = translate(&source, true).unwrap();
    assert_eq!(
        fused.0,
        vec![
            instr(OpCode::PUSH1_PUSH1, 0x0000),
            instr(OpCode::JUMP_TO, 4),
            instr(OpCode::NOOP, 0),
            instr(OpCode::NOOP, 0),
            instr(OpCode::JUMPDEST, 0),
            instr(OpCode::STOP, 0),
        ]
    );
    assert_eq!(fused[4].opcode, OpCode::JUMPDEST);
}

#[test]
fn eight_byte_patterns_win_over_shorter_ones() {
    // PUSH1 1; PUSH1 1; PUSH1 0xA0; SHL; SUB -- the 8-byte pattern must be
    // preferred over the 4-byte PUSH1_PUSH1 prefix.
    let source = [0x60, 0x01, 0x60, 0x01, 0x60, 0xA0, 0x1B, 0x03];
    let code = translate(&source, true).unwrap();
    assert_eq!(
        code.0,
        vec![
            instr(OpCode::PUSH1_PUSH1_PUSH1_SHL_SUB, 0x0101),
            instr(OpCode::DATA, 0x00A0),
        ]
    );
}

#[test]
fn unknown_opcodes_become_invalid() {
    let code = translate(&[0x0C, 0x00], false).unwrap();
    assert_eq!(code[0].opcode, OpCode::INVALID);
    assert_eq!(code[1].opcode, OpCode::STOP);
}

#[test]
fn pc_carries_its_byte_position() {
    // ADD; PC; STOP
    let code = translate(&[0x01, 0x58, 0x00], false).unwrap();
    assert_eq!(code[1], instr(OpCode::PC, 1));
}

#[test]
fn pc_beyond_the_argument_range_fails() {
    let mut source = vec![0x01; 70_000];
    source.push(0x58); // PC at byte 70_000
    let err = translate(&source, false).unwrap_err();
    assert_eq!(err, TranslationError::PcOutOfRange(70_000));
}

#[test]
fn translation_is_deterministic() {
    let source = [0x60, 0x05, 0x01, 0x5B, 0x60, 0x02, 0x56, 0x00];
    for si in [false, true] {
        assert_eq!(translate(&source, si).unwrap(), translate(&source, si).unwrap());
    }
}

#[test]
fn cache_returns_the_same_translation_for_a_key() {
    let runtime = Runtime::default();
    let address = Address::repeat_byte(0x11);
    let code = Bytes::from_static(&[0x60, 0x01, 0x50, 0x00]);

    let first = runtime.translate(address, &code, false, false).unwrap();
    let second = runtime.translate(address, &code, false, false).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(runtime.translation_cache_len(), 1);
}

#[test]
fn creation_mode_bypasses_the_cache() {
    let runtime = Runtime::default();
    let address = Address::repeat_byte(0x22);
    let code = Bytes::from_static(&[0x60, 0x01, 0x50, 0x00]);

    let first = runtime.translate(address, &code, false, true).unwrap();
    assert_eq!(runtime.translation_cache_len(), 0);

    let second = runtime.translate(address, &code, false, true).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn flagged_addresses_recheck_the_original_bytes() {
    let runtime = Runtime::default();
    let address = MUTABLE_CONTRACT_ADDRESSES[0];

    // Two different programs of the same length: the cache key collides.
    let original = Bytes::from_static(&[0x60, 0x01, 0x50, 0x00]);
    let replaced = Bytes::from_static(&[0x60, 0x02, 0x50, 0x00]);

    let first = runtime.translate(address, &original, false, false).unwrap();
    let second = runtime.translate(address, &replaced, false, false).unwrap();
    assert_ne!(*first, *second);

    // The mismatch did not overwrite the cached entry.
    let third = runtime.translate(address, &original, false, false).unwrap();
    assert!(Arc::ptr_eq(&first, &third));
}

#[test]
fn unflagged_addresses_trust_the_length_key() {
    let runtime = Runtime::default();
    let address = Address::repeat_byte(0x33);

    let original = Bytes::from_static(&[0x60, 0x01, 0x50, 0x00]);
    let replaced = Bytes::from_static(&[0x60, 0x02, 0x50, 0x00]);

    let first = runtime.translate(address, &original, false, false).unwrap();
    // Same length, different bytes: the stale entry is returned by design.
    let second = runtime.translate(address, &replaced, false, false).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn flagged_address_constants_match_the_known_contracts() {
    let expected = Address::from_slice(
        &hex::decode("a7cc236f81b04c1058e9bfb70e0ee9940e271676").unwrap(),
    );
    assert_eq!(MUTABLE_CONTRACT_ADDRESSES[0], expected);
}
