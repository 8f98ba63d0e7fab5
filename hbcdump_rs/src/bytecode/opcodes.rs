//! Instruction set table and decoder.

use std::fmt;

use thiserror::Error;

/// Encoding of a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Reg8,
    UInt8,
    UInt32,
    Imm32,
    /// Signed jump distance, relative to the start of the instruction.
    Addr8,
    StringId,
    FunctionId,
}

impl OperandKind {
    pub fn width(self) -> usize {
        match self {
            OperandKind::Reg8 | OperandKind::UInt8 | OperandKind::Addr8 => 1,
            OperandKind::UInt32 | OperandKind::Imm32 | OperandKind::StringId => 4,
            OperandKind::FunctionId => 4,
        }
    }
}

use OperandKind::*;

macro_rules! opcodes {
    ($($name:ident = $byte:literal [$($kind:ident),*]),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),*];

            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Opcode::$name),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name)),*
                }
            }

            pub fn operands(self) -> &'static [OperandKind] {
                match self {
                    $(Opcode::$name => &[$($kind),*]),*
                }
            }
        }
    };
}

opcodes! {
    Unreachable = 0 [],
    Mov = 1 [Reg8, Reg8],
    LoadConstUInt8 = 2 [Reg8, UInt8],
    LoadConstInt = 3 [Reg8, Imm32],
    LoadConstString = 4 [Reg8, StringId],
    LoadParam = 5 [Reg8, UInt8],
    GetGlobalObject = 6 [Reg8],
    Add = 7 [Reg8, Reg8, Reg8],
    Sub = 8 [Reg8, Reg8, Reg8],
    Mul = 9 [Reg8, Reg8, Reg8],
    Less = 10 [Reg8, Reg8, Reg8],
    Jmp = 11 [Addr8],
    JmpTrue = 12 [Addr8, Reg8],
    JmpFalse = 13 [Addr8, Reg8],
    Call = 14 [Reg8, Reg8, UInt8],
    CreateClosure = 15 [Reg8, Reg8, FunctionId],
    Ret = 16 [Reg8],
}

impl Opcode {
    /// Encoded size in bytes, opcode byte included.
    pub fn size(self) -> usize {
        1 + self.operands().iter().map(|k| k.width()).sum::<usize>()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(u8),
    UInt(u32),
    Imm(i32),
    Addr(i8),
    StringId(u32),
    FunctionId(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "r{r}"),
            Operand::UInt(v) => write!(f, "{v}"),
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Addr(d) => write!(f, "{d:+}"),
            Operand::StringId(id) => write!(f, "$s{id}"),
            Operand::FunctionId(id) => write!(f, "$f{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset from the start of the function body.
    pub offset: u32,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Encoded size in bytes.
    pub fn size(&self) -> u32 {
        self.opcode.size() as u32
    }

    /// Function-relative target of a jump, if this instruction has one.
    pub fn jump_target(&self) -> Option<u32> {
        self.operands.iter().find_map(|op| match op {
            Operand::Addr(d) => u32::try_from(i64::from(self.offset) + i64::from(*d)).ok(),
            _ => None,
        })
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {byte:#04x} at {offset:#06x}")]
    UnknownOpcode { offset: u32, byte: u8 },

    #[error("{opcode} at {offset:#06x} is truncated")]
    Truncated { offset: u32, opcode: Opcode },
}

impl DecodeError {
    pub fn offset(&self) -> u32 {
        match self {
            DecodeError::UnknownOpcode { offset, .. } | DecodeError::Truncated { offset, .. } => {
                *offset
            }
        }
    }
}

/// Iterator over the instructions of one function body.
///
/// Yields at most one error, after which it is exhausted.
pub struct Instructions<'a> {
    body: &'a [u8],
    pos: usize,
    failed: bool,
}

pub fn decode(body: &[u8]) -> Instructions<'_> {
    Instructions {
        body,
        pos: 0,
        failed: false,
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.body.len() {
            return None;
        }
        let offset = self.pos as u32;
        let byte = self.body[self.pos];
        let Some(opcode) = Opcode::from_byte(byte) else {
            self.failed = true;
            return Some(Err(DecodeError::UnknownOpcode { offset, byte }));
        };
        if self.pos + opcode.size() > self.body.len() {
            self.failed = true;
            return Some(Err(DecodeError::Truncated { offset, opcode }));
        }

        let mut cursor = self.pos + 1;
        let mut operands = Vec::with_capacity(opcode.operands().len());
        for kind in opcode.operands() {
            let raw = &self.body[cursor..cursor + kind.width()];
            cursor += kind.width();
            let wide = || u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            operands.push(match kind {
                OperandKind::Reg8 => Operand::Reg(raw[0]),
                OperandKind::UInt8 => Operand::UInt(u32::from(raw[0])),
                OperandKind::Addr8 => Operand::Addr(raw[0] as i8),
                OperandKind::UInt32 => Operand::UInt(wide()),
                OperandKind::Imm32 => Operand::Imm(wide() as i32),
                OperandKind::StringId => Operand::StringId(wide()),
                OperandKind::FunctionId => Operand::FunctionId(wide()),
            });
        }
        self.pos = cursor;
        Some(Ok(Instruction {
            offset,
            opcode,
            operands,
        }))
    }
}

/// Append one encoded instruction to `buf`.
///
/// `operands` are taken in table order and truncated to each operand's width.
///
/// # Panics
///
/// Panics if the operand count does not match the opcode's table entry.
pub fn emit(buf: &mut Vec<u8>, opcode: Opcode, operands: &[i64]) {
    assert_eq!(
        operands.len(),
        opcode.operands().len(),
        "{opcode} takes {} operands",
        opcode.operands().len()
    );
    buf.push(opcode as u8);
    for (kind, value) in opcode.operands().iter().zip(operands) {
        match kind.width() {
            1 => buf.push(*value as u8),
            _ => buf.extend_from_slice(&(*value as u32).to_le_bytes()),
        }
    }
}
