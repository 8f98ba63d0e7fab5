//! Command line flags and the session configuration built from them.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use super::repl::split_startup_commands;
use crate::disasm::DisassemblyFormat;

/// Bytecode dump tool
#[derive(Parser, Debug)]
#[command(name = "hbcdump", version, about = "Bytecode dump tool", long_about = None)]
#[command(group(
    ArgGroup::new("format")
        .args(["raw_disassemble", "pretty_disassemble", "objdump_disassemble"])
))]
pub struct Args {
    /// Input bytecode file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file name (default: stdout)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Optional source map, used by function-info
    #[arg(long, value_name = "FILE")]
    pub source_map: Option<PathBuf>,

    /// Commands to execute before entering interactive mode, separated by
    /// semicolons, e.g. -c "cmd1;cmd2;quit"
    #[arg(short = 'c', value_name = "COMMANDS")]
    pub commands: Option<String>,

    /// Legacy disassembly format
    #[arg(long)]
    pub raw_disassemble: bool,

    /// Pretty print disassembly (default)
    #[arg(long)]
    pub pretty_disassemble: bool,

    /// objdump-like disassembly
    #[arg(long)]
    pub objdump_disassemble: bool,

    /// Analysis mode; runs the matching stats command before the startup script
    #[arg(long, value_enum)]
    pub mode: Option<AnalyzeMode>,

    /// Basic block profiler log (JSON)
    #[arg(long, value_name = "FILE")]
    pub profile_file: Option<PathBuf>,

    /// Print the byte range of each section and exit
    #[arg(long)]
    pub show_section_ranges: bool,

    /// Print section ranges in hex
    #[arg(long)]
    pub human: bool,

    /// Log level for diagnostics on stderr (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnalyzeMode {
    Instruction,
    Function,
}

impl AnalyzeMode {
    /// Shell command that implements this mode.
    pub fn command(self) -> &'static str {
        match self {
            AnalyzeMode::Instruction => "instruction",
            AnalyzeMode::Function => "function",
        }
    }
}

/// Immutable session configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub source_map: Option<PathBuf>,
    pub profile_file: Option<PathBuf>,
    pub format: DisassemblyFormat,
    pub startup_commands: Vec<String>,
    pub show_section_ranges: bool,
    pub human: bool,
}

impl From<&Args> for DumpConfig {
    fn from(args: &Args) -> Self {
        let format = if args.raw_disassemble {
            DisassemblyFormat::Raw
        } else if args.objdump_disassemble {
            DisassemblyFormat::Objdump
        } else {
            DisassemblyFormat::Pretty
        };

        let mut startup_commands = Vec::new();
        if let Some(mode) = args.mode {
            startup_commands.push(mode.command().to_string());
        }
        if let Some(script) = &args.commands {
            startup_commands.extend(split_startup_commands(script));
        }

        Self {
            input: args.input.clone(),
            output: args.out.clone(),
            source_map: args.source_map.clone(),
            profile_file: args.profile_file.clone(),
            format,
            startup_commands,
            show_section_ranges: args.show_section_ranges,
            human: args.human,
        }
    }
}
