//! Opcode flag tables for the 32-bit x86 decoder.
//!
//! Two fixed 256-entry tables describe every first-level opcode byte and
//! every byte following the `0x0F` two-byte escape. Each entry is a
//! bitfield of [`OpcodeFlags`] describing what follows the opcode: whether
//! a ModR/M byte is present, whether the instruction carries a PC-relative
//! operand, and the size/kind of any immediate. The tables are transcribed
//! byte-exact from the Intel Architecture Software Developer's Manual
//! Volume 2 opcode maps; entries a production decoder should never need
//! (reserved/undefined bytes) carry `0` and are treated as "no extra bytes
//! follow" rather than being rejected.

use bitflags::bitflags;

bitflags! {
    /// Per-opcode flag word describing the bytes that follow an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OpcodeFlags: u32 {
        /// Instruction carries a ModR/M byte.
        const MODRM      = 0x0001;
        /// The immediate is a PC-relative displacement (control-flow target).
        const RELATIVE   = 0x0002;
        /// Immediate data is a single byte.
        const IMM_BYTE   = 0x0004;
        /// Immediate data is a word (16 bits).
        const IMM_WORD   = 0x0008;
        /// Immediate data is a dword (32 bits).
        const IMM_DWORD  = 0x0010;
        /// Immediate data is a qword (64 bits).
        const IMM_QWORD  = 0x0020;
        /// Immediate data is word or dword, chosen by the operand-size prefix.
        const IMM_V      = 0x0040;
        /// Immediate data is dword or offset:selector, chosen by the address-size prefix.
        const IMM_P      = 0x0080;
        /// Immediate data is 24 bits, encoded as word-then-byte (`ENTER`).
        const IMM_S      = 0x0100;
        /// Escape: the next byte indexes the two-byte opcode table.
        const ESCAPE     = 0x4000;
        /// Coprocessor escape; the decoder must signal a hard stop.
        const COPROC     = 0x8000;
    }
}

const M: u32 = OpcodeFlags::MODRM.bits();
const R: u32 = OpcodeFlags::RELATIVE.bits();
const B: u32 = OpcodeFlags::IMM_BYTE.bits();
const W: u32 = OpcodeFlags::IMM_WORD.bits();
const D: u32 = OpcodeFlags::IMM_DWORD.bits();
const Q: u32 = OpcodeFlags::IMM_QWORD.bits();
const V: u32 = OpcodeFlags::IMM_V.bits();
const P: u32 = OpcodeFlags::IMM_P.bits();
const S: u32 = OpcodeFlags::IMM_S.bits();
const E: u32 = OpcodeFlags::ESCAPE.bits();
const C: u32 = OpcodeFlags::COPROC.bits();

/// One-byte opcode flag map, indexed by the first opcode byte.
#[rustfmt::skip]
pub(crate) const OPCODE1_MAP: [u32; 256] = [
/* 00 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 08 */ M,        M,        M,        M,        B,        V,        0,        E,
/* 10 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 18 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 20 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 28 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 30 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 38 */ M,        M,        M,        M,        B,        V,        0,        0,
/* 40 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 48 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 50 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 58 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 60 */ 0,        0,        M,        M,        0,        0,        0,        0,
/* 68 */ V,        M|V,      B,        M|B,      0,        0,        0,        0,
/* 70 */ R|B,      R|B,      R|B,      R|B,      R|B,      R|B,      R|B,      R|B,
/* 78 */ R|B,      R|B,      R|B,      R|B,      R|B,      R|B,      R|B,      R|B,
/* 80 */ M|B,      M|V,      M|B,      M|B,      M,        M,        M,        M,
/* 88 */ M,        M,        M,        M,        M,        M,        M,        M,
/* 90 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 98 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* A0 */ V,        D,        V,        V,        M,        M,        M,        M,
/* A8 */ B,        V,        M,        M,        M,        M,        M,        M,
/* B0 */ B,        B,        B,        B,        B,        B,        B,        B,
/* B8 */ V,        V,        V,        V,        V,        V,        V,        V,
/* C0 */ M|B,      M|B,      W,        0,        M,        M,        M|B,      M|V,
/* C8 */ S,        0,        W,        0,        0,        B,        0,        0,
/* D0 */ M,        M,        M,        M,        0,        0,        0,        0,
/* D8 */ C,        C,        C,        C,        C,        C,        C,        C,
/* E0 */ R|B,      R|B,      R|B,      R|B,      B,        B,        B,        B,
/* E8 */ R|V,      R|V,      P,        R|B,      0,        0,        0,        0,
/* F0 */ 0,        0,        0,        0,        0,        0,        M,        M,
/* F8 */ 0,        0,        0,        0,        0,        0,        M,        M,
];

/// Two-byte opcode flag map, indexed by the byte following the `0x0F` escape.
#[rustfmt::skip]
pub(crate) const OPCODE2_MAP: [u32; 256] = [
/* 00 */ M,        0,        M,        M,        0,        0,        0,        0,
/* 08 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 10 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 18 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 20 */ M,        M,        M,        M,        0,        0,        0,        0,
/* 28 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 30 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 38 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 40 */ M,        M,        M,        M,        M,        M,        M,        M,
/* 48 */ M,        M,        M,        M,        M,        M,        M,        M,
/* 50 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 58 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 60 */ M,        M,        M,        M,        M,        M,        M,        M,
/* 68 */ M,        M,        M,        M,        0,        0,        M,        M,
/* 70 */ 0,        0,        0,        0,        M,        M,        M,        0,
/* 78 */ 0,        0,        0,        0,        0,        0,        M,        M,
/* 80 */ R|V,      R|V,      R|V,      R|V,      R|V,      R|V,      R|V,      R|V,
/* 88 */ R|V,      R|V,      R|V,      R|V,      R|V,      R|V,      R|V,      R|V,
/* 90 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* 98 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* A0 */ 0,        0,        0,        M,        M|B,      M,        0,        0,
/* A8 */ 0,        0,        0,        M,        M|B,      M,        0,        M,
/* B0 */ M,        M,        M,        M,        M,        M,        M,        M,
/* B8 */ 0,        0,        M|B,      M,        M,        M,        M,        M,
/* C0 */ M,        M,        0,        0,        0,        0,        0,        0,
/* C8 */ 0,        0,        0,        0,        0,        0,        0,        0,
/* D0 */ 0,        M,        M,        M,        0,        M,        0,        0,
/* D8 */ M,        M,        0,        M,        M,        M,        0,        M,
/* E0 */ 0,        M,        M,        0,        0,        M,        0,        0,
/* E8 */ M,        M,        0,        M,        M,        M,        0,        M,
/* F0 */ 0,        M,        M,        M,        0,        M,        0,        0,
/* F8 */ M,        M,        M,        0,        M,        M,        M,        0,
];

/// Look up the flags for a first-level opcode byte.
pub(crate) fn opcode1_flags(byte: u8) -> OpcodeFlags {
    OpcodeFlags::from_bits_truncate(OPCODE1_MAP[byte as usize])
}

/// Look up the flags for a byte following the `0x0F` two-byte escape.
pub(crate) fn opcode2_flags(byte: u8) -> OpcodeFlags {
    OpcodeFlags::from_bits_truncate(OPCODE2_MAP[byte as usize])
}

/// Legacy prefix bytes recognised by the decoder.
///
/// `0xF1` is listed as a REPNZ-slot prefix here, matching the source
/// behavior this decoder reproduces rather than the Intel-documented
/// REPNE/REP bytes (`0xF2`/`0xF3`) alone; see the module docs on
/// [`crate::instruction::decode`].
pub(crate) const PREFIX_LOCK: u8 = 0xF0;
pub(crate) const PREFIX_REPNZ_SLOT: u8 = 0xF1;
pub(crate) const PREFIX_REPZ: u8 = 0xF2;
pub(crate) const PREFIX_REP: u8 = 0xF3;
pub(crate) const PREFIX_CS: u8 = 0x2E;
pub(crate) const PREFIX_SS: u8 = 0x36;
pub(crate) const PREFIX_DS: u8 = 0x3E;
pub(crate) const PREFIX_ES: u8 = 0x26;
pub(crate) const PREFIX_FS: u8 = 0x64;
pub(crate) const PREFIX_GS: u8 = 0x65;
pub(crate) const PREFIX_OPSIZE: u8 = 0x66;
pub(crate) const PREFIX_ADDRSIZE: u8 = 0x67;

/// Is `byte` one of the eleven recognised legacy prefixes?
pub(crate) fn is_prefix(byte: u8) -> bool {
    matches!(
        byte,
        PREFIX_LOCK
            | PREFIX_REPNZ_SLOT
            | PREFIX_REPZ
            | PREFIX_CS
            | PREFIX_SS
            | PREFIX_DS
            | PREFIX_ES
            | PREFIX_FS
            | PREFIX_GS
            | PREFIX_OPSIZE
            | PREFIX_ADDRSIZE
    )
}

/// Maximum number of legacy prefixes the decoder accumulates.
pub(crate) const MAX_PREFIXES: usize = 4;

/// Two-byte opcode escape.
pub(crate) const OPCODE_ESCAPE: u8 = 0x0F;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_has_no_modrm() {
        assert_eq!(opcode1_flags(0x90), OpcodeFlags::empty());
    }

    #[test]
    fn call_rel32_is_relative_v() {
        let flags = opcode1_flags(0xE8);
        assert!(flags.contains(OpcodeFlags::RELATIVE));
        assert!(flags.contains(OpcodeFlags::IMM_V));
    }

    #[test]
    fn short_jcc_is_relative_byte() {
        for op in 0x70..=0x7F {
            let flags = opcode1_flags(op);
            assert!(flags.contains(OpcodeFlags::RELATIVE), "op {op:#x}");
            assert!(flags.contains(OpcodeFlags::IMM_BYTE), "op {op:#x}");
        }
    }

    #[test]
    fn near_jcc_is_relative_v() {
        for op in 0x80..=0x8F {
            let flags = opcode2_flags(op);
            assert!(flags.contains(OpcodeFlags::RELATIVE), "0f {op:#x}");
            assert!(flags.contains(OpcodeFlags::IMM_V), "0f {op:#x}");
        }
    }

    #[test]
    fn coprocessor_escapes_are_flagged() {
        for op in 0xD8..=0xDF {
            assert!(opcode1_flags(op).contains(OpcodeFlags::COPROC), "op {op:#x}");
        }
    }

    #[test]
    fn two_byte_escape_is_flagged() {
        assert!(opcode1_flags(0x0F).contains(OpcodeFlags::ESCAPE));
    }

    #[test]
    fn loop_family_is_relative_byte() {
        for op in 0xE0..=0xE3 {
            let flags = opcode1_flags(op);
            assert!(flags.contains(OpcodeFlags::RELATIVE), "op {op:#x}");
            assert!(flags.contains(OpcodeFlags::IMM_BYTE), "op {op:#x}");
        }
    }

    #[test]
    fn is_prefix_recognises_all_eleven() {
        for b in [0xF0u8, 0xF1, 0xF2, 0x2E, 0x36, 0x3E, 0x26, 0x64, 0x65, 0x66, 0x67] {
            assert!(is_prefix(b), "{b:#x}");
        }
        assert!(!is_prefix(0xF3 + 1));
        assert!(!is_prefix(0x90));
    }
}
