//! The instruction record and the decode/emit pipeline built on top of the
//! opcode tables and parameter codec.

use crate::error::{DecodeError, DecodeResult};
use crate::opcodes::{self, OpcodeFlags, MAX_PREFIXES, OPCODE_ESCAPE};
use crate::param::{Param, ParamKind};

/// A decoded x86 instruction: prefixes, opcode bytes, an optional ModR/M
/// and SIB byte, and an optional displacement and immediate.
///
/// This is a pure value: it borrows nothing from the byte slice it was
/// decoded from, so it can be held, cloned, or handed across threads freely
/// (see the crate-level docs on the pure core).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// Flags describing this instruction's shape, from the opcode tables.
    pub flags: OpcodeFlags,
    /// Legacy prefix bytes, in encounter order (at most [`MAX_PREFIXES`]).
    pub prefixes: Vec<u8>,
    /// Opcode bytes: one byte, or two when a `0x0F` escape is present.
    pub opcode: [u8; 2],
    /// Number of valid bytes in `opcode` (1 or 2).
    pub opcode_len: u8,
    /// Operand-size override prefix (`0x66`) was present.
    pub opsize_pref: bool,
    /// Address-size override prefix (`0x67`) was present.
    pub addrsize_pref: bool,
    /// ModR/M byte, if the opcode calls for one.
    pub modrm: Option<u8>,
    /// SIB byte, if ModR/M calls for one (see the module docs on the
    /// operand-size-gated quirk below).
    pub sib: Option<u8>,
    /// Address displacement, if ModR/M's addressing mode has one.
    pub disp: Param,
    /// Trailing immediate, relative offset, or far pointer.
    pub immd: Param,
}

impl Instruction {
    /// First opcode byte.
    pub fn opcode0(&self) -> u8 {
        self.opcode[0]
    }

    /// Does this instruction use the two-byte (`0x0F`-escaped) opcode form?
    pub fn is_two_byte(&self) -> bool {
        self.opcode_len == 2
    }

    /// Total encoded length in bytes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
            + self.opcode_len as usize
            + self.modrm.is_some() as usize
            + self.sib.is_some() as usize
            + self.disp.size()
            + self.immd.size()
    }

    /// Is this instruction flagged as PC-relative?
    pub fn is_relative(&self) -> bool {
        self.flags.contains(OpcodeFlags::RELATIVE)
    }
}

fn eof(offset: usize, needed: usize) -> DecodeError {
    DecodeError::UnexpectedEof { offset, needed }
}

fn next_byte(bytes: &[u8], offset: usize) -> DecodeResult<u8> {
    bytes.get(offset).copied().ok_or(eof(offset, 1))
}

/// Decode a single instruction from the front of `bytes`.
///
/// Returns the decoded [`Instruction`] and the number of bytes it consumed.
/// This mirrors the original prefix → opcode → ModR/M → SIB →
/// displacement → immediate pipeline exactly, including two source
/// quirks that are preserved rather than "fixed":
///
/// - `0xF1` occupies the REPNZ prefix slot (the Intel-documented REP/REPNE
///   bytes are `0xF2`/`0xF3`; this decoder's prefix table nonetheless
///   treats `0xF1` as a legacy prefix).
/// - The SIB byte's presence is gated on the **operand**-size prefix
///   (`0x66`) rather than the address-size prefix (`0x67`) that the Intel
///   manual specifies. Any ModR/M byte matching the SIB pattern while an
///   operand-size prefix is in effect is decoded without consuming a SIB
///   byte.
pub fn decode(bytes: &[u8]) -> DecodeResult<(Instruction, usize)> {
    #[cfg(feature = "cli")]
    tracing::trace!(available = bytes.len(), "decoding instruction");

    let mut offset = 0usize;
    let mut prefixes = Vec::new();
    let mut opsize_pref = false;
    let mut addrsize_pref = false;

    while prefixes.len() < MAX_PREFIXES {
        let b = match bytes.get(offset) {
            Some(&b) if opcodes::is_prefix(b) => b,
            _ => break,
        };
        if b == opcodes::PREFIX_OPSIZE {
            opsize_pref = true;
        } else if b == opcodes::PREFIX_ADDRSIZE {
            addrsize_pref = true;
        }
        prefixes.push(b);
        offset += 1;
    }

    let op0 = next_byte(bytes, offset)?;
    offset += 1;
    let mut flags = opcodes::opcode1_flags(op0);
    let mut opcode = [op0, 0];
    let mut opcode_len = 1u8;

    if flags.contains(OpcodeFlags::ESCAPE) {
        let op1 = next_byte(bytes, offset)?;
        offset += 1;
        flags = opcodes::opcode2_flags(op1);
        opcode[1] = op1;
        opcode_len = 2;
    } else if flags.contains(OpcodeFlags::COPROC) {
        return Err(DecodeError::CoprocessorEscape {
            opcode: op0,
            offset: offset - 1,
        });
    }

    let modrm = if flags.contains(OpcodeFlags::MODRM) {
        let b = next_byte(bytes, offset)?;
        offset += 1;
        Some(b)
    } else {
        None
    };

    let sib = if let Some(m) = modrm {
        if !opsize_pref && matches!(m & 0xC7, 0x04 | 0x44 | 0x84) {
            let b = next_byte(bytes, offset)?;
            offset += 1;
            Some(b)
        } else {
            None
        }
    } else {
        None
    };

    let disp_kind = modrm.and_then(|m| disp_kind_for_modrm(m, addrsize_pref));
    let disp = if let Some(kind) = disp_kind {
        let (p, n) = Param::read(kind, &bytes[offset..], offset)?;
        offset += n;
        p
    } else {
        Param::None
    };

    let immd_kind = ParamKind::from_flags(flags, opsize_pref, addrsize_pref);
    let immd = if !matches!(immd_kind, ParamKind::None) {
        let (p, n) = Param::read(immd_kind, &bytes[offset..], offset)?;
        offset += n;
        p
    } else {
        Param::None
    };

    #[cfg(feature = "cli")]
    tracing::debug!(opcode = format_args!("{op0:#04X}"), len = offset, "decoded instruction");

    Ok((
        Instruction {
            flags,
            prefixes,
            opcode,
            opcode_len,
            opsize_pref,
            addrsize_pref,
            modrm,
            sib,
            disp,
            immd,
        },
        offset,
    ))
}

/// Which [`ParamKind`] (if any) the displacement occupies, given the
/// ModR/M byte and whether an address-size prefix is in effect.
///
/// `ModR/M` bytes whose addressing mode has no displacement (register
/// direct, or memory-indirect with no base-displacement) return `None`.
/// The original C source has a latent uninitialized-read bug on exactly
/// this "no displacement" path (`mod == 00`, `rm` not the disp-only
/// encoding) which this decoder does not reproduce: there is nothing
/// meaningful to preserve from reading uninitialized stack memory, so the
/// sane behavior (no displacement) is implemented instead. See DESIGN.md.
fn disp_kind_for_modrm(modrm: u8, addrsize_pref: bool) -> Option<ParamKind> {
    let md = modrm & 0xC0;
    let rm = modrm & 0x07;
    if addrsize_pref {
        match md {
            0x00 if rm == 0x06 => Some(ParamKind::Word),
            0x00 => None,
            0x40 => Some(ParamKind::Byte),
            0x80 => Some(ParamKind::Word),
            _ => None,
        }
    } else {
        match md {
            0x00 if rm == 0x05 => Some(ParamKind::DWord),
            0x00 => None,
            0x40 => Some(ParamKind::Byte),
            0x80 => Some(ParamKind::DWord),
            _ => None,
        }
    }
}

/// Serialize `ins` to the front of `dst`, in the original field order:
/// prefixes, opcode bytes, ModR/M, SIB, displacement, immediate.
///
/// Returns the number of bytes written. `dst` must be at least
/// `ins.len()` bytes.
pub fn emit(ins: &Instruction, dst: &mut [u8]) -> usize {
    let mut offset = 0usize;
    for &p in &ins.prefixes {
        dst[offset] = p;
        offset += 1;
    }
    for i in 0..ins.opcode_len as usize {
        dst[offset] = ins.opcode[i];
        offset += 1;
    }
    if let Some(m) = ins.modrm {
        dst[offset] = m;
        offset += 1;
    }
    if let Some(s) = ins.sib {
        dst[offset] = s;
        offset += 1;
    }
    offset += ins.disp.write(&mut dst[offset..]);
    offset += ins.immd.write(&mut dst[offset..]);
    offset
}
