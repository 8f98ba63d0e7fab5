//! Disassembler.
//!
//! Renders function bodies in one of three styles chosen through
//! [`DisassemblyOptions`]:
//!
//! ```text
//! raw      Function<add>#1(3 params, 12 bytes):
//!              LoadParam r0, 1
//!
//! pretty   Function<add>#1(3 params, 12 bytes):
//!              0000: LoadParam         r0, 1
//!
//! objdump  00000086 <add>#1:
//!                86:  05 00 01               LoadParam r0, 1
//! ```

pub mod options;

use std::collections::BTreeSet;
use std::io::Write;

pub use options::{DisassemblyFormat, DisassemblyOptions, OptionsOverride};

use crate::bytecode::BytecodeModule;
use crate::bytecode::opcodes::{self, Instruction, Operand};
use crate::error::{InspectError, InspectResult};

/// Boundary the command dispatcher uses to reach a disassembler.
pub trait Disassembly {
    /// Currently applied session options.
    fn options(&self) -> DisassemblyOptions;

    fn set_options(&mut self, options: DisassemblyOptions);

    fn function_count(&self) -> u32;

    /// Disassemble every function in the module.
    fn disassemble(&self, out: &mut dyn Write) -> InspectResult;

    fn disassemble_function(&self, id: u32, out: &mut dyn Write) -> InspectResult;
}

/// Column width of the mnemonic in pretty output.
const MNEMONIC_WIDTH: usize = 18;

/// Column width of the raw byte dump in objdump output.
const OBJDUMP_BYTES_WIDTH: usize = 21;

pub struct Disassembler<'m> {
    module: &'m BytecodeModule,
    options: DisassemblyOptions,
}

impl<'m> Disassembler<'m> {
    pub fn new(module: &'m BytecodeModule) -> Self {
        Self {
            module,
            options: DisassemblyOptions::empty(),
        }
    }

    fn write_module_header(&self, out: &mut dyn Write) -> InspectResult {
        let m = self.module;
        writeln!(out, "Bytecode File Information:")?;
        writeln!(out, "  Bytecode version number: {}", m.version())?;
        writeln!(out, "  Function count: {}", m.function_count())?;
        writeln!(out, "  String count: {}", m.string_count())?;
        writeln!(out, "  Filename count: {}", m.filename_count())?;
        writeln!(out, "  Bytecode segment: {} bytes", m.bytecode().len())?;
        writeln!(out, "  Epilogue: {} bytes", m.epilogue().len())?;
        Ok(())
    }

    fn write_function(&self, id: u32, out: &mut dyn Write) -> InspectResult {
        let func = self
            .module
            .function(id)
            .ok_or(InspectError::NoSuchFunction(id))?;
        let body = self.module.function_body(id).unwrap_or_default();
        let name = self.module.function_name(id);
        let opts = self.options;
        let id_tag = if opts.contains(DisassemblyOptions::INCLUDE_FUNCTION_IDS) {
            format!("#{id}")
        } else {
            String::new()
        };
        let base = self.module.bytecode_offset() + func.offset as usize;

        if opts.contains(DisassemblyOptions::OBJDUMP) {
            writeln!(out, "{base:08x} <{name}>{id_tag}:")?;
        } else {
            writeln!(
                out,
                "Function<{name}>{id_tag}({} params, {} bytes):",
                func.param_count, func.size
            )?;
        }
        if opts.contains(DisassemblyOptions::INCLUDE_SOURCE) {
            if let Some((file, line)) = self.module.function_source(id) {
                writeln!(out, "; {file}:{line}")?;
            }
        }

        let mut instructions = Vec::new();
        let mut failure = None;
        for item in opcodes::decode(body) {
            match item {
                Ok(inst) => instructions.push(inst),
                Err(err) => failure = Some(err),
            }
        }

        let labels: BTreeSet<u32> = if opts.contains(DisassemblyOptions::PRETTY) {
            instructions.iter().filter_map(Instruction::jump_target).collect()
        } else {
            BTreeSet::new()
        };

        for inst in &instructions {
            let virtual_offset = func.offset + inst.offset;
            let prefix = if opts.contains(DisassemblyOptions::INCLUDE_VIRTUAL_OFFSETS) {
                format!("[@ {virtual_offset:#06x}] ")
            } else {
                String::new()
            };

            if opts.contains(DisassemblyOptions::OBJDUMP) {
                let start = inst.offset as usize;
                let raw = &body[start..start + inst.size() as usize];
                let hex: Vec<String> = raw.iter().map(|b| format!("{b:02x}")).collect();
                let line = format!(
                    "{prefix}{:>8x}:\t{:<width$}\t{} {}",
                    base + start,
                    hex.join(" "),
                    inst.opcode,
                    self.operands_text(inst, false),
                    width = OBJDUMP_BYTES_WIDTH
                );
                writeln!(out, "{}", line.trim_end())?;
            } else if opts.contains(DisassemblyOptions::PRETTY) {
                if labels.contains(&inst.offset) {
                    writeln!(out, "  L{:04x}:", inst.offset)?;
                }
                let line = format!(
                    "    {prefix}{:04x}: {:<width$}{}",
                    inst.offset,
                    inst.opcode.name(),
                    self.operands_text(inst, true),
                    width = MNEMONIC_WIDTH
                );
                writeln!(out, "{}", line.trim_end())?;
            } else {
                let line = format!(
                    "    {prefix}{} {}",
                    inst.opcode,
                    self.operands_text(inst, false)
                );
                writeln!(out, "{}", line.trim_end())?;
            }
        }

        if let Some(err) = failure {
            writeln!(out, "    <{err}>")?;
        }
        Ok(())
    }

    fn operands_text(&self, inst: &Instruction, pretty: bool) -> String {
        let rendered: Vec<String> = inst
            .operands
            .iter()
            .map(|op| match (*op, pretty) {
                (Operand::Addr(_), true) => match inst.jump_target() {
                    Some(target) => format!("L{target:04x}"),
                    None => op.to_string(),
                },
                (Operand::StringId(id), true) => match self.module.string(id) {
                    Some(text) => format!("{text:?}"),
                    None => op.to_string(),
                },
                (Operand::FunctionId(id), true) if id < self.module.function_count() => {
                    format!("Function<{}>", self.module.function_name(id))
                }
                _ => op.to_string(),
            })
            .collect();
        rendered.join(", ")
    }
}

impl Disassembly for Disassembler<'_> {
    fn options(&self) -> DisassemblyOptions {
        self.options
    }

    fn set_options(&mut self, options: DisassemblyOptions) {
        self.options = options;
    }

    fn function_count(&self) -> u32 {
        self.module.function_count()
    }

    fn disassemble(&self, out: &mut dyn Write) -> InspectResult {
        self.write_module_header(out)?;
        for id in 0..self.module.function_count() {
            writeln!(out)?;
            self.write_function(id, out)?;
        }
        Ok(())
    }

    fn disassemble_function(&self, id: u32, out: &mut dyn Write) -> InspectResult {
        self.write_function(id, out)
    }
}
