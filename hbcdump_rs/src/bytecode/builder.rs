//! Serializer for the container format read by [`BytecodeModule`](super::BytecodeModule).
//!
//! Used to produce fixtures:
//!
//! ```rust
//! use hbcdump::bytecode::BytecodeModule;
//! use hbcdump::bytecode::builder::ModuleBuilder;
//! use hbcdump::bytecode::opcodes::{Opcode, emit};
//!
//! let mut body = Vec::new();
//! emit(&mut body, Opcode::LoadParam, &[0, 1]);
//! emit(&mut body, Opcode::Ret, &[0]);
//!
//! let mut builder = ModuleBuilder::new();
//! builder.add_function("identity", 2, body);
//! let module = BytecodeModule::from_bytes(builder.build()).unwrap();
//! assert_eq!(module.function_name(0), "identity");
//! ```

use super::{MAGIC, NO_FILENAME, VERSION};

#[derive(Debug, Clone)]
struct PendingFunction {
    name_id: u32,
    param_count: u32,
    filename_id: Option<u32>,
    line: u32,
    body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleBuilder {
    strings: Vec<String>,
    filenames: Vec<String>,
    functions: Vec<PendingFunction>,
    epilogue: Vec<u8>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `text` in the string table and return its id.
    pub fn add_string(&mut self, text: &str) -> u32 {
        intern(&mut self.strings, text)
    }

    /// Intern `name` in the filename table and return its id.
    pub fn add_filename(&mut self, name: &str) -> u32 {
        intern(&mut self.filenames, name)
    }

    /// Append a function without debug info and return its id.
    pub fn add_function(&mut self, name: &str, param_count: u32, body: Vec<u8>) -> u32 {
        let name_id = self.add_string(name);
        self.push_function(PendingFunction {
            name_id,
            param_count,
            filename_id: None,
            line: 0,
            body,
        })
    }

    /// Append a function whose debug info points at `file:line`.
    pub fn add_function_with_source(
        &mut self,
        name: &str,
        param_count: u32,
        file: &str,
        line: u32,
        body: Vec<u8>,
    ) -> u32 {
        let name_id = self.add_string(name);
        let filename_id = Some(self.add_filename(file));
        self.push_function(PendingFunction {
            name_id,
            param_count,
            filename_id,
            line,
            body,
        })
    }

    pub fn set_epilogue(&mut self, bytes: &[u8]) -> &mut Self {
        self.epilogue = bytes.to_vec();
        self
    }

    /// Serialize the module. Function bodies are laid out in insertion order.
    pub fn build(&self) -> Vec<u8> {
        let bytecode_len: usize = self.functions.iter().map(|f| f.body.len()).sum();

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_le_bytes());
        for value in [
            VERSION,
            self.functions.len() as u32,
            self.strings.len() as u32,
            self.filenames.len() as u32,
            bytecode_len as u32,
            self.epilogue.len() as u32,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }

        let mut offset = 0u32;
        for func in &self.functions {
            for value in [
                offset,
                func.body.len() as u32,
                func.name_id,
                func.param_count,
                func.filename_id.unwrap_or(NO_FILENAME),
                func.line,
            ] {
                out.extend_from_slice(&value.to_le_bytes());
            }
            offset += func.body.len() as u32;
        }

        for table in [&self.strings, &self.filenames] {
            for entry in table {
                out.extend_from_slice(&(entry.len() as u32).to_le_bytes());
                out.extend_from_slice(entry.as_bytes());
            }
        }

        for func in &self.functions {
            out.extend_from_slice(&func.body);
        }
        out.extend_from_slice(&self.epilogue);
        out
    }

    fn push_function(&mut self, func: PendingFunction) -> u32 {
        self.functions.push(func);
        (self.functions.len() - 1) as u32
    }
}

fn intern(table: &mut Vec<String>, text: &str) -> u32 {
    if let Some(idx) = table.iter().position(|s| s == text) {
        return idx as u32;
    }
    table.push(text.to_string());
    (table.len() - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::opcodes::{Opcode, emit};
    use crate::bytecode::{BytecodeModule, HEADER_SIZE};

    #[test]
    fn interns_strings_once() {
        let mut builder = ModuleBuilder::new();
        assert_eq!(builder.add_string("a"), 0);
        assert_eq!(builder.add_string("b"), 1);
        assert_eq!(builder.add_string("a"), 0);
    }

    #[test]
    fn empty_module_is_just_a_header() {
        let bytes = ModuleBuilder::new().build();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let module = BytecodeModule::from_bytes(bytes).unwrap();
        assert_eq!(module.function_count(), 0);
        assert!(module.epilogue().is_empty());
    }

    #[test]
    fn lays_out_bodies_back_to_back() {
        let mut first = Vec::new();
        emit(&mut first, Opcode::Ret, &[0]);
        let mut second = Vec::new();
        emit(&mut second, Opcode::GetGlobalObject, &[1]);
        emit(&mut second, Opcode::Ret, &[1]);

        let mut builder = ModuleBuilder::new();
        builder.add_function("a", 1, first);
        builder.add_function_with_source("b", 1, "b.js", 9, second);
        let module = BytecodeModule::from_bytes(builder.build()).unwrap();

        assert_eq!(module.function(1).unwrap().offset, 2);
        assert_eq!(module.function(1).unwrap().size, 4);
        assert_eq!(module.function_source(0), None);
        assert_eq!(module.function_source(1), Some(("b.js", 9)));
        assert_eq!(module.bytecode().len(), 6);
    }
}
