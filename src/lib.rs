//! x86-inline-hook - 32-bit x86 instruction decoder, relocator, and inline
//! function-hook installer.
//!
//! This crate rewrites the first instructions of a running 32-bit x86
//! function with an unconditional jump into a generated trampoline that
//! invokes a user callback, re-executes the displaced original
//! instructions, and jumps back into the rest of the original function.
//! Everything that makes that possible lives here:
//!
//! - **Opcode tables** ([`opcodes`]) -- two 256-entry flag-word tables, one
//!   per opcode map (single-byte, and the `0x0F`-escaped two-byte map).
//! - **Parameter codec** ([`param`]) -- a typed immediate/displacement
//!   value and its little-endian wire codec.
//! - **Instruction decoder/emitter** ([`instruction`]) -- the
//!   prefixes -> opcode -> ModR/M -> SIB -> displacement -> immediate
//!   pipeline, and its inverse.
//! - **Relocator** ([`relocate`]) -- rewrites a PC-relative instruction so
//!   it behaves identically when executed from a different address.
//! - **Hook installer** ([`hook`]) -- combines all of the above into
//!   `install_hook`.
//!
//! # What this crate does *not* do
//!
//! It does not manage page permissions (`mprotect`/`VirtualProtect`),
//! allocate executable memory, resolve symbols, or synchronize against
//! concurrently executing threads -- those are the host's job. It targets
//! 32-bit x86 only: no REX prefixes, no RIP-relative addressing, no
//! 64-bit immediates. See the [`hook`] module docs for the exact contract
//! a caller must uphold around concurrent execution of the patched bytes.
//!
//! # Quick start
//!
//! ```rust
//! use x86_inline_hook::instruction::decode;
//!
//! // A single NOP.
//! let (ins, len) = decode(&[0x90]).unwrap();
//! assert_eq!(len, 1);
//! assert!(ins.modrm.is_none());
//! ```
//!
//! ```rust
//! use x86_inline_hook::hook::{install_hook, MIN_TRAMPOLINE_CAPACITY};
//!
//! // Five NOPs is the smallest target that gives `install_hook` the 5
//! // bytes it needs to plant a `JMP rel32`.
//! let mut target = [0x90u8; 16];
//! let mut trampoline = vec![0u8; MIN_TRAMPOLINE_CAPACITY];
//! let result = install_hook(&mut target, 0x1000, &mut trampoline, 0x9000, 0, 0x8000).unwrap();
//! assert_eq!(result.bytes_replaced, 5);
//! assert_eq!(target[0], 0xE9); // JMP rel32
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod formatter;
pub mod hook;
pub mod instruction;
pub mod opcodes;
pub mod param;
pub mod relocate;
pub mod types;

pub use error::{DecodeError, DecodeResult, InstallError, InstallResult, RelocateError, RelocateResult};
pub use formatter::{HumanFormatter, ReportFormatter, ShortFormatter};
pub use hook::{install_hook, HookInstall, MIN_TRAMPOLINE_CAPACITY};
pub use instruction::{decode, emit, Instruction};
pub use opcodes::OpcodeFlags;
pub use param::{Param, ParamKind};
pub use relocate::relocate;
pub use types::{DecodeReport, HookOptions, InstallReport, RelocateReport};

#[cfg(feature = "serde")]
pub use formatter::JsonFormatter;

/// Decode every instruction in `bytes`, front to back, stopping at the
/// first decode failure or once the input is exhausted.
///
/// This is a convenience wrapper over repeated [`decode`] calls -- the
/// crate's actual entry point for a single instruction is `decode` itself.
/// Returns the instructions successfully decoded and, if decoding stopped
/// early, the error that stopped it alongside the byte offset it occurred
/// at.
///
/// # Example
///
/// ```rust
/// use x86_inline_hook::decode_all;
///
/// let (instructions, failure) = decode_all(&[0x90, 0x90, 0xE8, 0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(instructions.len(), 3);
/// assert!(failure.is_none());
/// ```
pub fn decode_all(bytes: &[u8]) -> (Vec<Instruction>, Option<(usize, DecodeError)>) {
    let mut offset = 0;
    let mut instructions = Vec::new();
    while offset < bytes.len() {
        match decode(&bytes[offset..]) {
            Ok((ins, len)) => {
                instructions.push(ins);
                offset += len;
            }
            Err(err) => return (instructions, Some((offset, err))),
        }
    }
    (instructions, None)
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn decode_all_stops_at_first_failure() {
        let (instructions, failure) = decode_all(&[0x90, 0xD8, 0x00]);
        assert_eq!(instructions.len(), 1);
        let (offset, err) = failure.unwrap();
        assert_eq!(offset, 1);
        assert!(matches!(err, DecodeError::CoprocessorEscape { .. }));
    }

    #[test]
    fn decode_all_decodes_a_run_of_instructions() {
        let (instructions, failure) =
            decode_all(&[0x90, 0x90, 0xE8, 0x01, 0x02, 0x03, 0x04, 0xEB, 0x10]);
        assert_eq!(instructions.len(), 4);
        assert!(failure.is_none());
    }

    #[test]
    fn public_api_reexports_are_usable_without_module_paths() {
        let (ins, n) = decode(&[0x90]).unwrap();
        let mut out = vec![0u8; n];
        assert_eq!(emit(&ins, &mut out), n);
    }
}
