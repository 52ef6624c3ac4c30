//! End-to-end scenarios exercised through the public API only.
//!
//! These mirror the worked examples in the specification: decoding a short
//! run of instructions, relocating a jump between two synthetic addresses,
//! and installing a full hook over an in-memory target/trampoline pair.
//! Relocation correctness is checked against the same `abs2rel`-style
//! formula the relocator itself uses (address arithmetic, not literal
//! expected bytes), since that is the actual invariant the specification's
//! testable property describes.

use proptest::prelude::*;
use x86_inline_hook::hook::{install_hook, MIN_TRAMPOLINE_CAPACITY};
use x86_inline_hook::instruction::{decode, emit};
use x86_inline_hook::relocate::relocate;
use x86_inline_hook::{decode_all, DecodeError, InstallError};

fn abs2rel(base: u32, abs: u32) -> u32 {
    abs.wrapping_sub(base)
}

#[test]
fn decodes_a_short_instruction_stream() {
    let bytes = [0x90, 0x90, 0xE8, 0x01, 0x02, 0x03, 0x04, 0xEB, 0x10];
    let (instructions, failure) = decode_all(&bytes);
    assert!(failure.is_none());
    assert_eq!(instructions.len(), 4);
    assert_eq!(instructions[0].len(), 1);
    assert_eq!(instructions[1].len(), 1);
    assert_eq!(instructions[2].len(), 5);
    assert_eq!(instructions[3].len(), 2);
}

#[test]
fn decode_stops_cleanly_at_a_coprocessor_escape() {
    let bytes = [0x90, 0xD8, 0xC0];
    let (instructions, failure) = decode_all(&bytes);
    assert_eq!(instructions.len(), 1);
    let (offset, err) = failure.expect("coprocessor escape should fail decoding");
    assert_eq!(offset, 1);
    assert!(matches!(err, DecodeError::CoprocessorEscape { opcode: 0xD8, .. }));
}

#[test]
fn relocating_jmp_rel8_targets_the_same_absolute_address_regardless_of_where_it_lands() {
    // JMP +0x10, originally decoded at src=0x1000 (so its post-decode
    // cursor, the convention `relocate` expects, is 0x1002).
    let (ins, len) = decode(&[0xEB, 0x10]).unwrap();
    let src_addr = 0x1002u32;

    for dst_addr in [0x2000u32, 0x5000u32, 0x1002u32] {
        let mut out = [0u8; 5];
        let n = relocate(&mut out, dst_addr, &ins, src_addr).unwrap();
        assert_eq!(n, 5);
        assert_eq!(out[0], 0xE9);

        let rel = u32::from_le_bytes([out[1], out[2], out[3], out[4]]);
        let landed_at = dst_addr.wrapping_add(5).wrapping_add(rel);
        let original_target = src_addr.wrapping_add(0x10);
        assert_eq!(landed_at, original_target);
    }
    let _ = len;
}

#[test]
fn relocating_near_jcc_preserves_its_absolute_target() {
    let bytes = [0x0F, 0x84, 0x10, 0x00, 0x00, 0x00];
    let (ins, _len) = decode(&bytes).unwrap();
    let src_addr = 0x1006u32;
    let dst_addr = 0x9000u32;

    let mut out = [0u8; 6];
    let n = relocate(&mut out, dst_addr, &ins, src_addr).unwrap();
    assert_eq!(n, 6);

    // The original's SIZEOF_J32 quirk: the rel32 base uses a 5-byte size
    // even though this instruction occupies 6 bytes once relocated.
    let rel = u32::from_le_bytes([out[2], out[3], out[4], out[5]]);
    let landed_at = abs2rel(0, dst_addr.wrapping_add(5).wrapping_add(rel));
    let original_target = abs2rel(0, src_addr.wrapping_add(0x10));
    assert_eq!(landed_at, original_target);
}

#[test]
fn install_hook_round_trip_preserves_control_flow_addresses() {
    // CALL rel32 to some far-off absolute address, then four NOPs to pad
    // the covered prefix out past 5 bytes.
    let mut target = vec![0xE8u8, 0x00, 0x00, 0x00, 0x00, 0x90, 0x90, 0x90, 0x90];
    let target_addr = 0x4000_0000u32;
    let call_target = target_addr.wrapping_add(5).wrapping_add(0x1234);
    let rel = call_target.wrapping_sub(target_addr.wrapping_add(5));
    target[1..5].copy_from_slice(&rel.to_le_bytes());
    let original_target = target.clone();

    let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];
    let trampoline_addr = 0x5000_0000u32;
    let callback_addr = 0x6000_0000u32;

    let result = install_hook(
        &mut target,
        target_addr,
        &mut trampoline,
        trampoline_addr,
        0xCAFE_BABE,
        callback_addr,
    )
    .unwrap();

    assert_eq!(result.bytes_replaced, 5);
    assert_eq!(target[0], 0xE9);

    // The relocated CALL in the trampoline must still resolve to the same
    // absolute address the original CALL pointed at.
    let prologue_size = 11;
    assert_eq!(trampoline[prologue_size], 0xE8);
    let relocated_rel = u32::from_le_bytes([
        trampoline[prologue_size + 1],
        trampoline[prologue_size + 2],
        trampoline[prologue_size + 3],
        trampoline[prologue_size + 4],
    ]);
    let relocated_dst_addr = trampoline_addr.wrapping_add(prologue_size as u32);
    let landed_at = relocated_dst_addr.wrapping_add(5).wrapping_add(relocated_rel);
    assert_eq!(landed_at, call_target);

    let _ = original_target;
}

#[test]
fn install_hook_leaves_target_untouched_on_failure() {
    let mut target = vec![0x90u8; 3]; // too short to cover 5 bytes
    let original = target.clone();
    let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];

    let err =
        install_hook(&mut target, 0x1000, &mut trampoline, 0x9000, 0, 0x8000).unwrap_err();
    assert!(matches!(err, InstallError::Decode(_)));
    assert_eq!(target, original);
}

proptest! {
    /// Any byte string the decoder accepts either decodes to a length that
    /// matches what `emit` reproduces for it, or the decoder rejects it --
    /// never does `decode` silently accept a malformed stream and hand
    /// back a nonsensical length.
    #[test]
    fn decode_emit_round_trip_preserves_length(bytes in prop::collection::vec(any::<u8>(), 1..16)) {
        if let Ok((ins, len)) = decode(&bytes) {
            let mut out = vec![0u8; len];
            let written = emit(&ins, &mut out);
            prop_assert_eq!(written, len);
        }
    }

    /// Decoding a run of plain single-byte NOPs always yields exactly that
    /// many one-byte instructions, regardless of how many are strung
    /// together.
    #[test]
    fn a_run_of_nops_decodes_one_instruction_per_byte(count in 1usize..64) {
        let bytes = vec![0x90u8; count];
        let (instructions, failure) = decode_all(&bytes);
        prop_assert!(failure.is_none());
        prop_assert_eq!(instructions.len(), count);
        prop_assert!(instructions.iter().all(|ins| ins.len() == 1));
    }
}
