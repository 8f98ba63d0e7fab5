//! Shared fixtures for unit tests.

use crate::bytecode::BytecodeModule;
use crate::bytecode::builder::ModuleBuilder;
use crate::bytecode::opcodes::{Opcode, emit};
use crate::profile::ProfileTrace;

/// Three functions laid out at virtual offsets 0, 21 and 33 (57 bytes total).
///
/// * `#0 global` (21 bytes): builds a closure over `add` and calls it.
/// * `#1 add` (12 bytes): adds its two parameters.
/// * `#2 loop` (24 bytes): counts to ten; blocks start at 0, 9, 16 and 22.
pub(crate) fn sample_module_bytes() -> Vec<u8> {
    let mut builder = ModuleBuilder::new();
    let hello = builder.add_string("hello");

    let mut global = Vec::new();
    emit(&mut global, Opcode::GetGlobalObject, &[0]);
    emit(&mut global, Opcode::LoadConstString, &[1, i64::from(hello)]);
    emit(&mut global, Opcode::CreateClosure, &[2, 0, 1]);
    emit(&mut global, Opcode::Call, &[3, 2, 1]);
    emit(&mut global, Opcode::Ret, &[3]);

    let mut add = Vec::new();
    emit(&mut add, Opcode::LoadParam, &[0, 1]);
    emit(&mut add, Opcode::LoadParam, &[1, 2]);
    emit(&mut add, Opcode::Add, &[2, 0, 1]);
    emit(&mut add, Opcode::Ret, &[2]);

    let mut counter = Vec::new();
    emit(&mut counter, Opcode::LoadConstUInt8, &[0, 0]);
    emit(&mut counter, Opcode::LoadConstUInt8, &[1, 10]);
    emit(&mut counter, Opcode::LoadConstUInt8, &[3, 1]);
    emit(&mut counter, Opcode::Less, &[2, 0, 1]);
    emit(&mut counter, Opcode::JmpFalse, &[9, 2]);
    emit(&mut counter, Opcode::Add, &[0, 0, 3]);
    emit(&mut counter, Opcode::Jmp, &[-11]);
    emit(&mut counter, Opcode::Ret, &[0]);

    builder.add_function_with_source("global", 1, "main.js", 1, global);
    builder.add_function_with_source("add", 3, "main.js", 3, add);
    builder.add_function_with_source("loop", 1, "main.js", 7, counter);
    builder.set_epilogue(b"EPILOGUE-META");
    builder.build()
}

pub(crate) fn sample_module() -> BytecodeModule {
    BytecodeModule::from_bytes(sample_module_bytes()).expect("sample module loads")
}

/// Profile for [`sample_module`]: `global` once, `add` never, `loop` ten
/// iterations. 51 instructions executed in total.
pub(crate) const SAMPLE_PROFILE_JSON: &str = r#"{
  "blocks": [
    { "function": 0, "offset": 0, "count": 1 },
    { "function": 1, "offset": 0, "count": 0 },
    { "function": 2, "offset": 0, "count": 1 },
    { "function": 2, "offset": 9, "count": 11 },
    { "function": 2, "offset": 16, "count": 10 },
    { "function": 2, "offset": 22, "count": 1 }
  ],
  "trace": [
    { "function": 0, "offset": 0 },
    { "function": 2, "offset": 0 },
    { "function": 2, "offset": 9 },
    { "function": 2, "offset": 16 },
    { "function": 2, "offset": 22 }
  ]
}"#;

pub(crate) fn sample_profile() -> ProfileTrace {
    ProfileTrace::from_slice(SAMPLE_PROFILE_JSON.as_bytes()).expect("sample profile parses")
}
