//! Output formatters for decode/relocate/install reports.
//!
//! This module provides trait-based formatters for rendering the CLI's
//! three report types in various output formats (human-readable, JSON,
//! compact), the same shape the classifier this crate is descended from
//! uses for its own detection payloads.

use crate::instruction::Instruction;
use crate::param::Param;
use crate::types::{DecodeReport, InstallReport, RelocateReport};

/// Trait for formatting hook-tooling reports.
pub trait ReportFormatter {
    /// Format a single decoded instruction.
    fn format_decode(&self, report: &DecodeReport) -> String;

    /// Format a single relocated instruction.
    fn format_relocate(&self, report: &RelocateReport) -> String;

    /// Format a demo hook installation.
    fn format_install(&self, report: &InstallReport) -> String;
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

fn param_str(param: &Param) -> Option<String> {
    match *param {
        Param::None => None,
        Param::Byte(b) => Some(format!("0x{b:02X}")),
        Param::Word(w) => Some(format!("0x{w:04X}")),
        Param::DWord(d) => Some(format!("0x{d:08X}")),
        Param::QWord(q) => Some(format!("0x{q:016X}")),
        Param::OffSel { offset, selector } => Some(format!("0x{selector:04X}:0x{offset:08X}")),
        Param::D24 { word, byte } => Some(format!("0x{word:04X}{byte:02X}")),
    }
}

fn describe_instruction(ins: &Instruction) -> String {
    let mut parts = Vec::new();
    if !ins.prefixes.is_empty() {
        parts.push(format!("prefixes={}", hex_bytes(&ins.prefixes)));
    }
    parts.push(format!(
        "opcode={}",
        hex_bytes(&ins.opcode[..ins.opcode_len as usize])
    ));
    if let Some(modrm) = ins.modrm {
        parts.push(format!("modrm=0x{modrm:02X}"));
    }
    if let Some(sib) = ins.sib {
        parts.push(format!("sib=0x{sib:02X}"));
    }
    if let Some(disp) = param_str(&ins.disp) {
        parts.push(format!("disp={disp}"));
    }
    if let Some(immd) = param_str(&ins.immd) {
        parts.push(format!("imm={immd}"));
    }
    if ins.is_relative() {
        parts.push("relative".to_string());
    }
    parts.join(", ")
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanFormatter {
    /// Show the opcode-flags breakdown alongside the summary line.
    pub verbose: bool,
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_decode(&self, report: &DecodeReport) -> String {
        let mut s = format!(
            "offset {:>4}: {:<24} {} byte(s)\n",
            report.offset,
            hex_bytes(&report.bytes),
            report.bytes.len()
        );
        if self.verbose {
            s.push_str(&format!("  {}\n", describe_instruction(&report.instruction)));
            s.push_str(&format!("  flags={:?}\n", report.instruction.flags));
        }
        s
    }

    fn format_relocate(&self, report: &RelocateReport) -> String {
        format!(
            "0x{:08X}: {}\n0x{:08X}: {}\n",
            report.src_addr,
            hex_bytes(&report.original),
            report.dst_addr,
            hex_bytes(&report.relocated)
        )
    }

    fn format_install(&self, report: &InstallReport) -> String {
        format!(
            "target   0x{:08X}: {} byte(s) replaced with a JMP rel32\n\
             trampoline 0x{:08X}: {} byte(s) used\n",
            report.target_addr,
            report.install.bytes_replaced,
            report.trampoline_addr,
            report.install.trampoline_bytes_used
        )
    }
}

/// Compact single-line output formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for ShortFormatter {
    fn format_decode(&self, report: &DecodeReport) -> String {
        format!(
            "{}\t{}\t{}\n",
            report.offset,
            hex_bytes(&report.bytes),
            report.bytes.len()
        )
    }

    fn format_relocate(&self, report: &RelocateReport) -> String {
        format!(
            "0x{:08X}->0x{:08X}\t{}\n",
            report.src_addr,
            report.dst_addr,
            hex_bytes(&report.relocated)
        )
    }

    fn format_install(&self, report: &InstallReport) -> String {
        format!(
            "0x{:08X}\t{}\t{}\n",
            report.target_addr, report.install.bytes_replaced, report.install.trampoline_bytes_used
        )
    }
}

/// JSON output formatter, requires the `serde` feature.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy)]
pub struct JsonFormatter {
    /// Pretty-print JSON.
    pub pretty: bool,
}

#[cfg(feature = "serde")]
impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[cfg(feature = "serde")]
impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn render<T: serde::Serialize>(&self, value: &T) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }
}

#[cfg(feature = "serde")]
impl ReportFormatter for JsonFormatter {
    fn format_decode(&self, report: &DecodeReport) -> String {
        self.render(report)
    }

    fn format_relocate(&self, report: &RelocateReport) -> String {
        self.render(report)
    }

    fn format_install(&self, report: &InstallReport) -> String {
        self.render(report)
    }
}
