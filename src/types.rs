//! Ambient configuration and reporting types.
//!
//! These types are not part of the decoder/relocator/installer contract
//! itself -- they exist so a CLI (or any other host embedding this crate)
//! has something structured to print, log, or serialize. [`HookOptions`]
//! configures the one knob `install_hook` exposes beyond its required
//! arguments; the `*Report` types package a decode/relocate/install result
//! together with the addresses and raw bytes involved, for
//! [`crate::formatter`] to render.

use crate::hook::HookInstall;
use crate::instruction::Instruction;

/// Options controlling how [`crate::hook::install_hook`] is driven from a
/// host (the CLI demo command, or any caller that wants named presets
/// instead of threading a raw capacity through by hand).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HookOptions {
    /// Size of the trampoline buffer to allocate for a demo installation.
    /// Must be at least [`crate::hook::MIN_TRAMPOLINE_CAPACITY`];
    /// `install_hook` itself re-validates this regardless of what a host
    /// passes here.
    pub trampoline_capacity: usize,
}

impl HookOptions {
    /// Default options: a trampoline sized exactly to the minimum capacity
    /// `install_hook` requires.
    pub fn new() -> Self {
        Self {
            trampoline_capacity: crate::hook::MIN_TRAMPOLINE_CAPACITY,
        }
    }

    /// Options with headroom beyond the minimum, for hosts that want to
    /// reuse one trampoline buffer across hooks on functions with larger
    /// prologues.
    pub fn generous() -> Self {
        Self {
            trampoline_capacity: crate::hook::MIN_TRAMPOLINE_CAPACITY * 2,
        }
    }
}

impl Default for HookOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of decoding a single instruction from a byte blob, packaged
/// for display: the offset it was found at, the raw bytes it consumed, and
/// the decoded [`Instruction`] itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeReport {
    /// Byte offset within the input this instruction started at.
    pub offset: usize,
    /// The raw bytes the instruction consumed.
    pub bytes: Vec<u8>,
    /// The decoded instruction record.
    pub instruction: Instruction,
}

/// The result of relocating a single instruction from one synthetic
/// address to another, packaged for display.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelocateReport {
    /// Address the instruction was originally decoded at.
    pub src_addr: u32,
    /// Address the instruction was relocated to.
    pub dst_addr: u32,
    /// The original instruction's raw bytes.
    pub original: Vec<u8>,
    /// The relocated instruction's raw bytes.
    pub relocated: Vec<u8>,
}

/// The result of a demo hook installation over an in-memory buffer,
/// packaged for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstallReport {
    /// Synthetic address the target function was mapped at.
    pub target_addr: u32,
    /// Synthetic address the trampoline was mapped at.
    pub trampoline_addr: u32,
    /// The installer's own result.
    pub install: HookInstall,
}
