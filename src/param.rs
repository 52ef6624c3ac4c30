//! Typed immediate/displacement value container and its little-endian wire
//! codec.
//!
//! An x86 instruction's trailing immediate or displacement can be one of a
//! handful of fixed shapes (a byte, a word, a dword, a 48-bit far pointer,
//! ...). [`Param`] represents whichever shape a given opcode's flags call
//! for, and [`Param::read`]/[`Param::write`] move it to and from a byte
//! slice in the same order the original encoding uses.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DecodeError, DecodeResult};
use crate::opcodes::OpcodeFlags;

/// Which shape of [`Param`] an opcode's flags call for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamKind {
    /// No trailing value.
    None,
    /// Single byte.
    Byte,
    /// 16-bit word.
    Word,
    /// 32-bit dword.
    DWord,
    /// 64-bit qword (only ever written with a `QWORD` flag; currently
    /// unreachable from the shipped opcode tables, kept for completeness).
    QWord,
    /// Word-or-dword chosen by the operand-size prefix.
    V { opsize_pref: bool },
    /// Dword-or-far-pointer chosen by the address-size prefix.
    P { addrsize_pref: bool },
    /// 24-bit `ENTER`-style immediate: a word followed by a byte.
    S,
}

impl ParamKind {
    /// Derive the kind of trailing value an opcode's flags describe, given
    /// the operand-size and address-size prefix state in effect.
    pub(crate) fn from_flags(flags: OpcodeFlags, opsize_pref: bool, addrsize_pref: bool) -> Self {
        if flags.contains(OpcodeFlags::IMM_QWORD) {
            ParamKind::QWord
        } else if flags.contains(OpcodeFlags::IMM_S) {
            ParamKind::S
        } else if flags.contains(OpcodeFlags::IMM_P) {
            ParamKind::P { addrsize_pref }
        } else if flags.contains(OpcodeFlags::IMM_V) {
            ParamKind::V { opsize_pref }
        } else if flags.contains(OpcodeFlags::IMM_DWORD) {
            ParamKind::DWord
        } else if flags.contains(OpcodeFlags::IMM_WORD) {
            ParamKind::Word
        } else if flags.contains(OpcodeFlags::IMM_BYTE) {
            ParamKind::Byte
        } else {
            ParamKind::None
        }
    }

    /// Number of bytes this kind occupies on the wire.
    pub fn size(self) -> usize {
        match self {
            ParamKind::None => 0,
            ParamKind::Byte => 1,
            ParamKind::Word => 2,
            ParamKind::DWord => 4,
            ParamKind::QWord => 8,
            ParamKind::V { opsize_pref } => {
                if opsize_pref {
                    2
                } else {
                    4
                }
            }
            ParamKind::P { addrsize_pref } => {
                if addrsize_pref {
                    4
                } else {
                    6
                }
            }
            ParamKind::S => 3,
        }
    }
}

/// A decoded immediate, displacement, or far-pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Param {
    /// No value present.
    #[default]
    None,
    /// Single byte.
    Byte(u8),
    /// 16-bit word.
    Word(u16),
    /// 32-bit dword.
    DWord(u32),
    /// 64-bit qword.
    QWord(u64),
    /// Far pointer: a 32-bit offset and a 16-bit segment selector.
    OffSel { offset: u32, selector: u16 },
    /// 24-bit `ENTER`-style immediate: a 16-bit word and an 8-bit byte.
    D24 { word: u16, byte: u8 },
}

impl Param {
    /// Read a value of the given `kind` from the front of `src`.
    ///
    /// Returns the value and the number of bytes consumed. `P`'s far-pointer
    /// form reads offset-then-selector, matching the original encoding's
    /// field order.
    pub fn read(kind: ParamKind, src: &[u8], offset: usize) -> DecodeResult<(Param, usize)> {
        let need = kind.size();
        if src.len() < need {
            return Err(DecodeError::UnexpectedEof {
                offset,
                needed: need - src.len(),
            });
        }
        let param = match kind {
            ParamKind::None => Param::None,
            ParamKind::Byte => Param::Byte(src[0]),
            ParamKind::Word => Param::Word(LittleEndian::read_u16(src)),
            ParamKind::DWord => Param::DWord(LittleEndian::read_u32(src)),
            ParamKind::QWord => Param::QWord(LittleEndian::read_u64(src)),
            ParamKind::V { opsize_pref } => {
                if opsize_pref {
                    Param::Word(LittleEndian::read_u16(src))
                } else {
                    Param::DWord(LittleEndian::read_u32(src))
                }
            }
            ParamKind::P { addrsize_pref } => {
                if addrsize_pref {
                    Param::DWord(LittleEndian::read_u32(src))
                } else {
                    Param::OffSel {
                        offset: LittleEndian::read_u32(&src[0..4]),
                        selector: LittleEndian::read_u16(&src[4..6]),
                    }
                }
            }
            ParamKind::S => Param::D24 {
                word: LittleEndian::read_u16(&src[0..2]),
                byte: src[2],
            },
        };
        Ok((param, need))
    }

    /// Write this value to the front of `dst`, returning the number of
    /// bytes written.
    ///
    /// `D24` values are never written by the relocator or emitter in
    /// practice (the original encoding never re-synthesizes an `ENTER`
    /// immediate after decoding one), but writing one here is still
    /// well-defined for completeness and for round-trip tests.
    pub fn write(&self, dst: &mut [u8]) -> usize {
        match *self {
            Param::None => 0,
            Param::Byte(b) => {
                dst[0] = b;
                1
            }
            Param::Word(w) => {
                LittleEndian::write_u16(&mut dst[0..2], w);
                2
            }
            Param::DWord(d) => {
                LittleEndian::write_u32(&mut dst[0..4], d);
                4
            }
            Param::QWord(q) => {
                LittleEndian::write_u64(&mut dst[0..8], q);
                8
            }
            Param::OffSel { offset, selector } => {
                LittleEndian::write_u32(&mut dst[0..4], offset);
                LittleEndian::write_u16(&mut dst[4..6], selector);
                6
            }
            Param::D24 { word, byte } => {
                LittleEndian::write_u16(&mut dst[0..2], word);
                dst[2] = byte;
                3
            }
        }
    }

    /// Number of bytes this value occupies on the wire.
    pub fn size(&self) -> usize {
        match self {
            Param::None => 0,
            Param::Byte(_) => 1,
            Param::Word(_) => 2,
            Param::DWord(_) => 4,
            Param::QWord(_) => 8,
            Param::OffSel { .. } => 6,
            Param::D24 { .. } => 3,
        }
    }

    /// Interpret this value as a signed 32-bit displacement, widening
    /// smaller forms. Used by the relocator, which only ever deals with
    /// `Byte` and `DWord`/`Word` relative displacements.
    pub(crate) fn as_i32(&self) -> Option<i32> {
        match *self {
            Param::Byte(b) => Some(b as i8 as i32),
            Param::Word(w) => Some(w as i16 as i32),
            Param::DWord(d) => Some(d as i32),
            _ => None,
        }
    }
}
