//! Error types for the decoder, relocator and hook installer.
//!
//! Each stage of the pipeline has its own error enum, mirroring how far a
//! caller got before something went wrong. None of these are retried
//! internally; malformed input is always reported to the caller rather than
//! panicking or silently truncating.

use thiserror::Error;

/// Errors raised while decoding an instruction from a byte slice.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    /// The input ended before a complete instruction could be read.
    #[error("unexpected end of input at offset {offset}: needed at least {needed} more byte(s)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// The opcode byte is flagged as a coprocessor escape (`0xD8`-`0xDF`),
    /// which this decoder does not support.
    #[error("coprocessor escape opcode 0x{opcode:02X} at offset {offset}")]
    CoprocessorEscape { opcode: u8, offset: usize },
}

/// Result type alias for decoder operations.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Errors raised while relocating an instruction to a new address.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RelocateError {
    /// The destination buffer is too small to hold the relocated bytes.
    #[error("relocation output buffer too small: needed {needed} byte(s), have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The instruction is flagged as PC-relative but its opcode does not
    /// match any of the relocation cases this crate implements.
    #[error(
        "unsupported PC-relative opcode for relocation: 0x{opcode:02X} (two-byte: {two_byte})"
    )]
    UnsupportedOpcode { opcode: u8, two_byte: bool },

    /// The instruction is flagged as PC-relative and matches one of the
    /// relocation cases, but its `immd` does not carry the byte/word/dword
    /// displacement that case requires (e.g. a hand-constructed
    /// [`crate::instruction::Instruction`] with `immd: Param::None`).
    #[error(
        "malformed relative instruction for relocation: opcode 0x{opcode:02X} (two-byte: {two_byte}) carries no usable displacement"
    )]
    MalformedInstruction { opcode: u8, two_byte: bool },
}

/// Result type alias for relocator operations.
pub type RelocateResult<T> = std::result::Result<T, RelocateError>;

/// Errors raised while installing an inline hook.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The trampoline buffer is smaller than [`crate::hook::MIN_TRAMPOLINE_CAPACITY`].
    #[error("trampoline buffer too small: need at least {required} bytes, have {available}")]
    TrampolineTooSmall { required: usize, available: usize },

    /// Decoding one of the target function's original instructions failed.
    /// This is also how a target function shorter than 5 bytes is reported:
    /// decoding runs off the end of the supplied slice before 5 bytes are
    /// covered.
    #[error("failed to decode target instruction while relocating: {0}")]
    Decode(#[from] DecodeError),

    /// Relocating one of the target function's original instructions failed.
    #[error("failed to relocate target instruction: {0}")]
    Relocate(#[from] RelocateError),
}

/// Result type alias for hook-installer operations.
pub type InstallResult<T> = std::result::Result<T, InstallError>;
