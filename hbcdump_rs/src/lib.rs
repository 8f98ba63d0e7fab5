//! # hbcdump
//!
//! **Interactive inspection shell for compiled bytecode modules.**
//!
//! Load a module, optionally with a basic-block profile and a source map, and
//! query it with short commands: disassemble functions, look up string and
//! filename table entries, rank hot functions, instructions and blocks, view
//! the page-level IO working set, and dump section ranges or the epilogue.
//!
//! ## CLI Usage
//!
//! ```bash
//! hbcdump app.hbc                              # interactive shell
//! hbcdump app.hbc -c "summary;quit"            # scripted
//! hbcdump app.hbc --profile-file p.json --mode function -c quit
//! hbcdump app.hbc --show-section-ranges --human
//! ```
//!
//! ## Library Usage
//!
//! ```rust
//! use hbcdump::bytecode::BytecodeModule;
//! use hbcdump::bytecode::builder::ModuleBuilder;
//! use hbcdump::bytecode::opcodes::{Opcode, emit};
//! use hbcdump::cli::Dispatcher;
//! use hbcdump::disasm::Disassembler;
//! use hbcdump::profile::ProfileAnalyzer;
//!
//! let mut body = Vec::new();
//! emit(&mut body, Opcode::LoadParam, &[0, 1]);
//! emit(&mut body, Opcode::Ret, &[0]);
//! let mut builder = ModuleBuilder::new();
//! builder.add_function("identity", 2, body);
//! let module = BytecodeModule::from_bytes(builder.build()).unwrap();
//!
//! let mut disassembler = Disassembler::new(&module);
//! let analyzer = ProfileAnalyzer::new(&module, None, None);
//! let mut dispatcher = Dispatcher::new(&mut disassembler, &analyzer);
//! let mut out = Vec::new();
//! dispatcher.execute("dis 0", &mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().contains("LoadParam"));
//! ```

// ============================================================================
// Inputs
// ============================================================================

/// Container loader, instruction set and section layout.
pub mod bytecode;

/// Source map v3 parsing.
pub mod sourcemap;

// ============================================================================
// Collaborators
// ============================================================================

/// Disassembler and its rendering options.
pub mod disasm;

/// Profile analyzer.
pub mod profile;

pub mod error;

// ============================================================================
// Shell
// ============================================================================

/// Command loop, dispatcher, help and startup.
pub mod cli;

#[cfg(test)]
mod testing;

pub use bytecode::{BytecodeModule, LoadError};
pub use disasm::{Disassembler, Disassembly, DisassemblyFormat, DisassemblyOptions};
pub use error::{InspectError, InspectResult};
pub use profile::{Analysis, ProfileAnalyzer, ProfileTrace};
pub use sourcemap::SourceMap;
