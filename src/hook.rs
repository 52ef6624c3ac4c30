//! Inline function hook installer.
//!
//! Builds on the [`crate::instruction`] decoder/emitter and the
//! [`crate::relocate`] relocator to rewrite a target function's first
//! instructions with a `JMP rel32` into a generated trampoline. The
//! trampoline invokes a user callback with a user argument, re-executes the
//! displaced original instructions (relocated so they behave identically
//! from their new address), then jumps back into the rest of the original
//! function.
//!
//! This module performs no raw pointer arithmetic against live process
//! memory: the target function and the trampoline are both given to
//! [`install_hook`] as plain `&mut [u8]` slices, paired with the `u32`
//! address each slice is mapped at. Turning a real function pointer into
//! such a slice (and making the target writable/executable in the first
//! place) is the host's job -- see the crate-level docs.

use crate::error::{InstallError, InstallResult};
use crate::instruction::{decode, emit};
use crate::relocate::relocate;

/// `PUSH imm32` opcode.
const OPCODE_PUSH32: u8 = 0x68;
/// `CALL rel32` opcode.
const OPCODE_CALL32: u8 = 0xE8;
/// `POP eax` opcode.
const OPCODE_POPEAX: u8 = 0x58;
/// `JMP rel32` opcode.
const OPCODE_JMP32: u8 = 0xE9;

const SIZEOF_PUSH32: usize = 5;
const SIZEOF_CALL32: usize = 5;
const SIZEOF_POPEAX: usize = 1;
const SIZEOF_JMP32: usize = 5;

/// Number of bytes of the original function's prologue a `JMP rel32` patch
/// overwrites.
pub const PATCH_SIZE: usize = SIZEOF_JMP32;

/// Offset within the trampoline of the first relocated original instruction,
/// i.e. the size of the `PUSH arg` / `CALL callback` / `POP eax` prologue.
const PROLOGUE_SIZE: usize = SIZEOF_PUSH32 + SIZEOF_CALL32 + SIZEOF_POPEAX;

/// Minimum trampoline buffer capacity [`install_hook`] requires.
///
/// Derived exactly as the original `KHOOK_SIZEOF_MAXCODE`: prologue, plus
/// the worst-case recoded-instruction budget (`3 + 2*16 = 35` bytes,
/// rounded up to `0x80` bytes of headroom), plus the closing `JMP rel32`.
pub const MIN_TRAMPOLINE_CAPACITY: usize = PROLOGUE_SIZE + 0x80 + SIZEOF_JMP32;

/// Result of a successful [`install_hook`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HookInstall {
    /// Number of bytes of the target function that were overwritten with
    /// the tail `JMP rel32` (always [`PATCH_SIZE`] in this implementation,
    /// but callers should rely on the field, not the constant, in case a
    /// future revision patches more).
    pub bytes_replaced: usize,
    /// Number of trampoline bytes actually written (`<=` the buffer's
    /// capacity).
    pub trampoline_bytes_used: usize,
}

/// Install an inline hook on the function at `target_addr`.
///
/// `target` is a writable view of the function's bytes, mapped at
/// `target_addr`; `trampoline` is a writable/executable scratch buffer
/// mapped at `trampoline_addr`. `arg` is handed to `callback` (mapped at
/// `callback_addr`) on every call, alongside the return-into-original
/// address that sits above it on the stack after the `CALL` (see the
/// crate-level docs for the exact ABI the generated prologue implements).
///
/// On success, the first [`HookInstall::bytes_replaced`] bytes of `target`
/// have been overwritten with a `JMP rel32` into the trampoline, and the
/// first [`HookInstall::trampoline_bytes_used`] bytes of `trampoline` hold
/// the generated prologue, relocated original instructions, and tail jump.
/// On failure, `target` is left entirely unmodified: a
/// [`InstallError::TrampolineTooSmall`], [`InstallError::Decode`] or
/// [`InstallError::Relocate`] is reported before any patching happens,
/// matching the original's "fail before mutating the target" contract.
pub fn install_hook(
    target: &mut [u8],
    target_addr: u32,
    trampoline: &mut [u8],
    trampoline_addr: u32,
    arg: u32,
    callback_addr: u32,
) -> InstallResult<HookInstall> {
    #[cfg(feature = "cli")]
    tracing::debug!(target_addr, trampoline_addr, callback_addr, "installing hook");

    if trampoline.len() < MIN_TRAMPOLINE_CAPACITY {
        return Err(InstallError::TrampolineTooSmall {
            required: MIN_TRAMPOLINE_CAPACITY,
            available: trampoline.len(),
        });
    }

    let mut dst = PROLOGUE_SIZE;
    let mut consumed = 0usize;
    let mut src = 0usize;

    while consumed < PATCH_SIZE {
        let (ins, ins_len) = decode(&target[src..])?;
        let post_decode_addr = target_addr.wrapping_add((src + ins_len) as u32);
        let dst_addr = trampoline_addr.wrapping_add(dst as u32);

        let written = relocate(&mut trampoline[dst..], dst_addr, &ins, post_decode_addr)?;
        dst += written;
        src += ins_len;
        consumed += ins_len;
    }

    write_prologue(&mut trampoline[..PROLOGUE_SIZE], trampoline_addr, arg, callback_addr);

    let tail_target = target_addr.wrapping_add(consumed as u32);
    let tail_dst_addr = trampoline_addr.wrapping_add(dst as u32);
    write_jmp32(&mut trampoline[dst..dst + SIZEOF_JMP32], tail_dst_addr, tail_target);
    dst += SIZEOF_JMP32;

    write_jmp32(&mut target[..PATCH_SIZE], target_addr, trampoline_addr);

    #[cfg(feature = "cli")]
    tracing::debug!(bytes_replaced = consumed, trampoline_bytes_used = dst, "hook installed");

    Ok(HookInstall {
        bytes_replaced: consumed,
        trampoline_bytes_used: dst,
    })
}

/// Write the `PUSH arg` / `CALL callback` / `POP eax` prologue at the front
/// of `dst`, which must be mapped at `dst_addr` and at least
/// [`PROLOGUE_SIZE`] bytes long.
fn write_prologue(dst: &mut [u8], dst_addr: u32, arg: u32, callback_addr: u32) {
    dst[0] = OPCODE_PUSH32;
    dst[1..5].copy_from_slice(&arg.to_le_bytes());

    let call_site = dst_addr.wrapping_add(SIZEOF_PUSH32 as u32);
    dst[5] = OPCODE_CALL32;
    let call_rel = callback_addr.wrapping_sub(call_site.wrapping_add(SIZEOF_CALL32 as u32));
    dst[6..10].copy_from_slice(&call_rel.to_le_bytes());

    dst[10] = OPCODE_POPEAX;
}

/// Write a 5-byte `JMP rel32` at the front of `dst`, which must be mapped
/// at `dst_addr`, targeting `target_addr`.
fn write_jmp32(dst: &mut [u8], dst_addr: u32, target_addr: u32) {
    dst[0] = OPCODE_JMP32;
    let rel = target_addr.wrapping_sub(dst_addr.wrapping_add(SIZEOF_JMP32 as u32));
    dst[1..5].copy_from_slice(&rel.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_jmp32_target(bytes: &[u8], at_addr: u32) -> u32 {
        assert_eq!(bytes[0], OPCODE_JMP32);
        let rel = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        at_addr.wrapping_add(SIZEOF_JMP32 as u32).wrapping_add(rel)
    }

    #[test]
    fn rejects_undersized_trampoline() {
        let mut target = [0x90u8; 16];
        let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY - 1];
        let err = install_hook(&mut target, 0x1000, &mut trampoline, 0x9000, 0xAAAA_AAAA, 0x8000)
            .unwrap_err();
        assert!(matches!(err, InstallError::TrampolineTooSmall { .. }));
    }

    #[test]
    fn patches_five_nops_and_builds_trampoline() {
        let mut target = [0x90u8; 16];
        let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];
        let result = install_hook(
            &mut target,
            0x1000,
            &mut trampoline,
            0x9000,
            0xDEAD_BEEF,
            0x8000,
        )
        .unwrap();

        // Five one-byte NOPs are the smallest target that covers 5 bytes.
        assert_eq!(result.bytes_replaced, 5);

        assert_eq!(target[0], OPCODE_JMP32);
        assert_eq!(read_jmp32_target(&target, 0x1000), 0x9000);

        assert_eq!(trampoline[0], OPCODE_PUSH32);
        assert_eq!(&trampoline[1..5], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(trampoline[5], OPCODE_CALL32);
        assert_eq!(trampoline[10], OPCODE_POPEAX);

        // Five relocated NOPs (1 byte each, pass-through emit) at
        // offset PROLOGUE_SIZE, then the tail jump back into target+5.
        for i in 0..5 {
            assert_eq!(trampoline[PROLOGUE_SIZE + i], 0x90);
        }
        let tail = PROLOGUE_SIZE + 5;
        assert_eq!(
            read_jmp32_target(&trampoline[tail..], 0x9000 + tail as u32),
            0x1005
        );
        assert_eq!(result.trampoline_bytes_used, tail + SIZEOF_JMP32);
    }

    #[test]
    fn relocates_a_short_jump_inside_the_covered_prefix() {
        // EB 03 (jmp +3) then three NOPs: covers exactly 5 bytes in two
        // instructions, and the jmp8 must widen to jmp32 in the trampoline.
        let mut target = [0xEBu8, 0x03, 0x90, 0x90, 0x90, 0x90, 0x90];
        let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];
        let result =
            install_hook(&mut target, 0x1000, &mut trampoline, 0x9000, 0, 0x8000).unwrap();
        assert_eq!(result.bytes_replaced, 2 + 3);

        assert_eq!(trampoline[PROLOGUE_SIZE], OPCODE_JMP32);
        let jmp_target = read_jmp32_target(&trampoline[PROLOGUE_SIZE..], 0x9000 + PROLOGUE_SIZE as u32);
        // Original: srcaddr passed to relocate is the post-decode address
        // (0x1002), so the widened jump keeps targeting srcaddr + disp.
        assert_eq!(jmp_target, 0x1002u32.wrapping_add(3));
    }

    #[test]
    fn decode_error_leaves_target_untouched() {
        let mut target = [0xD8u8, 0x00, 0x90, 0x90, 0x90, 0x90];
        let original = target;
        let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];
        let err =
            install_hook(&mut target, 0x1000, &mut trampoline, 0x9000, 0, 0x8000).unwrap_err();
        assert!(matches!(err, InstallError::Decode(_)));
        assert_eq!(target, original);
    }

    #[test]
    fn target_shorter_than_patch_size_is_reported_as_decode_failure() {
        // Three one-byte NOPs: decoding runs off the end of the slice
        // before 5 bytes are covered, surfacing as a decode error.
        let mut target = [0x90u8; 3];
        let original = target;
        let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];
        let err = install_hook(&mut target, 0x1000, &mut trampoline, 0x9000, 0, 0x8000)
            .unwrap_err();
        assert!(matches!(err, InstallError::Decode(_)));
        assert_eq!(target, original);
    }
}
