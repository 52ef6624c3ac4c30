//! `xhook` - x86 inline-hook tooling CLI.
//!
//! A thin wrapper over [`x86_inline_hook`] for poking at the decoder,
//! relocator, and hook installer from the command line: feed it hex bytes
//! and synthetic addresses, get back a human-readable, short, or JSON
//! report of what the library did.

use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use x86_inline_hook::formatter::{HumanFormatter, JsonFormatter, ReportFormatter, ShortFormatter};
use x86_inline_hook::hook::install_hook;
use x86_inline_hook::instruction::decode;
use x86_inline_hook::relocate::relocate;
use x86_inline_hook::types::{DecodeReport, HookOptions, InstallReport, RelocateReport};

/// x86 inline-hook decoder/relocator/installer tooling.
#[derive(Parser, Debug)]
#[command(name = "xhook")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, global = true, default_value = "human")]
    format: OutputFormat,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode every instruction in a hex-encoded byte blob.
    Decode {
        /// Hex-encoded instruction bytes, e.g. "90E801020304".
        hex: String,
    },
    /// Decode a single instruction and relocate it from one synthetic
    /// address to another.
    Relocate {
        /// Hex-encoded instruction bytes, one instruction.
        hex: String,
        /// Address the instruction is decoded at.
        #[arg(long, value_parser = parse_addr)]
        src_addr: u32,
        /// Address to relocate it to.
        #[arg(long, value_parser = parse_addr)]
        dst_addr: u32,
    },
    /// Install a demo hook over an in-memory scratch buffer and print the
    /// resulting target patch and trampoline.
    InstallDemo {
        /// Hex-encoded bytes of the target function (at least 5 bytes
        /// worth of whole instructions).
        hex: String,
        /// Address the target function is mapped at.
        #[arg(long, value_parser = parse_addr)]
        target_addr: u32,
        /// Address the trampoline buffer is mapped at.
        #[arg(long, value_parser = parse_addr)]
        trampoline_addr: u32,
        /// Address of the callback the trampoline should invoke.
        #[arg(long, value_parser = parse_addr)]
        callback_addr: u32,
        /// Argument value passed to the callback.
        #[arg(long, value_parser = parse_addr, default_value = "0")]
        arg: u32,
        /// Allocate a trampoline with headroom beyond the minimum capacity,
        /// for functions with larger prologues.
        #[arg(long)]
        generous: bool,
    },
}

fn parse_addr(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Compact single-line output
    Short,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("x86_inline_hook=debug")
            .init();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    match &args.command {
        Command::Decode { hex } => run_decode(hex, args.format),
        Command::Relocate {
            hex,
            src_addr,
            dst_addr,
        } => run_relocate(hex, *src_addr, *dst_addr, args.format),
        Command::InstallDemo {
            hex,
            target_addr,
            trampoline_addr,
            callback_addr,
            arg,
            generous,
        } => run_install_demo(
            hex,
            *target_addr,
            *trampoline_addr,
            *callback_addr,
            *arg,
            *generous,
            args.format,
        ),
    }
}

fn run_decode(hex_str: &str, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = hex::decode(hex_str.trim())?;
    let mut offset = 0;
    while offset < bytes.len() {
        let (instruction, len) = decode(&bytes[offset..])?;
        let report = DecodeReport {
            offset,
            bytes: bytes[offset..offset + len].to_vec(),
            instruction,
        };
        print!("{}", render_decode(&report, format));
        offset += len;
    }
    Ok(())
}

fn run_relocate(
    hex_str: &str,
    src_addr: u32,
    dst_addr: u32,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let original = hex::decode(hex_str.trim())?;
    let (instruction, _len) = decode(&original)?;

    let mut relocated = vec![0u8; 16];
    let written = relocate(&mut relocated, dst_addr, &instruction, src_addr)?;
    relocated.truncate(written);

    let report = RelocateReport {
        src_addr,
        dst_addr,
        original,
        relocated,
    };
    print!("{}", render_relocate(&report, format));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_install_demo(
    hex_str: &str,
    target_addr: u32,
    trampoline_addr: u32,
    callback_addr: u32,
    arg: u32,
    generous: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut target = hex::decode(hex_str.trim())?;
    let options = if generous {
        HookOptions::generous()
    } else {
        HookOptions::new()
    };
    let mut trampoline = vec![0u8; options.trampoline_capacity];

    let install = install_hook(
        &mut target,
        target_addr,
        &mut trampoline,
        trampoline_addr,
        arg,
        callback_addr,
    )?;

    let report = InstallReport {
        target_addr,
        trampoline_addr,
        install,
    };
    print!("{}", render_install(&report, format));

    trampoline.truncate(install.trampoline_bytes_used);
    println!("target bytes:     {}", hex::encode_upper(&target));
    println!("trampoline bytes: {}", hex::encode_upper(&trampoline));
    Ok(())
}

fn render_decode(report: &DecodeReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => HumanFormatter::verbose().format_decode(report),
        OutputFormat::Short => ShortFormatter::new().format_decode(report),
        OutputFormat::Json => JsonFormatter::new().format_decode(report),
    }
}

fn render_relocate(report: &RelocateReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => HumanFormatter::new().format_relocate(report),
        OutputFormat::Short => ShortFormatter::new().format_relocate(report),
        OutputFormat::Json => JsonFormatter::new().format_relocate(report),
    }
}

fn render_install(report: &InstallReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => HumanFormatter::new().format_install(report),
        OutputFormat::Short => ShortFormatter::new().format_install(report),
        OutputFormat::Json => JsonFormatter::new().format_install(report),
    }
}
