//! Bytecode container loading.
//!
//! A module file is a fixed header followed by five sections laid out back to
//! back (all integers little-endian):
//!
//! ```text
//! header          magic u64, version u32, function/string/filename counts,
//!                 bytecode length u32, epilogue length u32     (32 bytes)
//! function_table  offset, size, name id, params, filename id, line (24 bytes each)
//! string_table    u32 length + UTF-8 bytes, repeated
//! filename_table  same encoding as string_table
//! bytecode        instruction stream; function offsets are relative to here
//! epilogue        opaque trailing metadata, must end at EOF
//! ```
//!
//! [`BytecodeModule::from_bytes`] validates the whole layout up front, so the
//! rest of the crate can index tables without re-checking bounds.

pub mod builder;
pub mod opcodes;
pub mod sections;

use thiserror::Error;

/// File magic (`0x1F1903C103BC1FC6`).
pub const MAGIC: u64 = 0x1F19_03C1_03BC_1FC6;

/// The only container version this loader understands.
pub const VERSION: u32 = 1;

pub const HEADER_SIZE: usize = 32;
pub const FUNCTION_HEADER_SIZE: usize = 24;

/// Encoded in place of a filename id when a function has no debug info.
pub const NO_FILENAME: u32 = u32::MAX;

/// Reasons a buffer cannot be turned into a [`BytecodeModule`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("file is too small to hold a header ({0} bytes)")]
    TooSmall(usize),

    #[error("bad magic number {0:#018x}")]
    BadMagic(u64),

    #[error("unsupported bytecode version {found} (expected {VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("{section} is truncated at byte {offset}")]
    Truncated { section: &'static str, offset: usize },

    #[error("entry {index} of {section} is not valid UTF-8")]
    InvalidUtf8 { section: &'static str, index: u32 },

    #[error("function {id} spans {start}..{end}, outside the {len}-byte bytecode segment")]
    FunctionOutOfBounds {
        id: u32,
        start: u64,
        end: u64,
        len: usize,
    },

    #[error("function {id} refers to missing {table} entry {index}")]
    DanglingReference {
        id: u32,
        table: &'static str,
        index: u32,
    },

    #[error("{0} unexpected bytes after the epilogue")]
    TrailingBytes(usize),
}

/// Byte span `[start, end)` of one structural section of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
}

impl SectionRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Per-function metadata from the function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHeader {
    /// Virtual offset: byte offset from the start of the bytecode segment.
    pub offset: u32,
    pub size: u32,
    pub name_id: u32,
    pub param_count: u32,
    /// `None` when the function carries no debug info.
    pub filename_id: Option<u32>,
    pub line: u32,
}

impl FunctionHeader {
    /// True when `virtual_offset` falls inside this function's body.
    pub fn contains(&self, virtual_offset: u32) -> bool {
        let start = u64::from(self.offset);
        let end = start + u64::from(self.size);
        (start..end).contains(&u64::from(virtual_offset))
    }
}

/// A fully validated, read-only bytecode module.
#[derive(Debug, Clone)]
pub struct BytecodeModule {
    bytes: Vec<u8>,
    version: u32,
    functions: Vec<FunctionHeader>,
    strings: Vec<String>,
    filenames: Vec<String>,
    sections: Vec<SectionRange>,
}

impl BytecodeModule {
    /// Parse and validate a module from its raw file contents.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(LoadError::TooSmall(bytes.len()));
        }

        let mut reader = Reader::new(&bytes);
        let magic = reader.u64("header")?;
        if magic != MAGIC {
            return Err(LoadError::BadMagic(magic));
        }
        let version = reader.u32("header")?;
        if version != VERSION {
            return Err(LoadError::UnsupportedVersion { found: version });
        }
        let function_count = reader.u32("header")?;
        let string_count = reader.u32("header")?;
        let filename_count = reader.u32("header")?;
        let bytecode_len = reader.u32("header")? as usize;
        let epilogue_len = reader.u32("header")? as usize;
        let mut sections = vec![SectionRange {
            name: "header",
            start: 0,
            end: reader.pos,
        }];

        let start = reader.pos;
        let mut functions = Vec::new();
        for _ in 0..function_count {
            let offset = reader.u32("function_table")?;
            let size = reader.u32("function_table")?;
            let name_id = reader.u32("function_table")?;
            let param_count = reader.u32("function_table")?;
            let filename_id = reader.u32("function_table")?;
            let line = reader.u32("function_table")?;
            functions.push(FunctionHeader {
                offset,
                size,
                name_id,
                param_count,
                filename_id: (filename_id != NO_FILENAME).then_some(filename_id),
                line,
            });
        }
        sections.push(SectionRange {
            name: "function_table",
            start,
            end: reader.pos,
        });

        let start = reader.pos;
        let strings = reader.string_table("string_table", string_count)?;
        sections.push(SectionRange {
            name: "string_table",
            start,
            end: reader.pos,
        });

        let start = reader.pos;
        let filenames = reader.string_table("filename_table", filename_count)?;
        sections.push(SectionRange {
            name: "filename_table",
            start,
            end: reader.pos,
        });

        let start = reader.pos;
        reader.take("bytecode", bytecode_len)?;
        sections.push(SectionRange {
            name: "bytecode",
            start,
            end: reader.pos,
        });

        let start = reader.pos;
        reader.take("epilogue", epilogue_len)?;
        sections.push(SectionRange {
            name: "epilogue",
            start,
            end: reader.pos,
        });

        let trailing = bytes.len() - reader.pos;
        if trailing != 0 {
            return Err(LoadError::TrailingBytes(trailing));
        }

        for (id, func) in functions.iter().enumerate() {
            let id = id as u32;
            let start = u64::from(func.offset);
            let end = start + u64::from(func.size);
            if end > bytecode_len as u64 {
                return Err(LoadError::FunctionOutOfBounds {
                    id,
                    start,
                    end,
                    len: bytecode_len,
                });
            }
            if func.name_id >= string_count {
                return Err(LoadError::DanglingReference {
                    id,
                    table: "string_table",
                    index: func.name_id,
                });
            }
            if let Some(file) = func.filename_id.filter(|file| *file >= filename_count) {
                return Err(LoadError::DanglingReference {
                    id,
                    table: "filename_table",
                    index: file,
                });
            }
        }

        Ok(Self {
            bytes,
            version,
            functions,
            strings,
            filenames,
            sections,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn file_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn function_count(&self) -> u32 {
        self.functions.len() as u32
    }

    pub fn function(&self, id: u32) -> Option<&FunctionHeader> {
        self.functions.get(id as usize)
    }

    pub fn functions(&self) -> &[FunctionHeader] {
        &self.functions
    }

    /// Name of function `id`, or `""` when the id is out of range.
    pub fn function_name(&self, id: u32) -> &str {
        self.function(id)
            .and_then(|f| self.string(f.name_id))
            .unwrap_or_default()
    }

    /// Instruction bytes of function `id`.
    pub fn function_body(&self, id: u32) -> Option<&[u8]> {
        let func = self.function(id)?;
        let start = func.offset as usize;
        self.bytecode().get(start..start + func.size as usize)
    }

    /// Debug-info source location (`file`, `line`) of function `id`.
    pub fn function_source(&self, id: u32) -> Option<(&str, u32)> {
        let func = self.function(id)?;
        let file = self.filename(func.filename_id?)?;
        Some((file, func.line))
    }

    pub fn string_count(&self) -> u32 {
        self.strings.len() as u32
    }

    pub fn string(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    pub fn filename_count(&self) -> u32 {
        self.filenames.len() as u32
    }

    pub fn filename(&self, id: u32) -> Option<&str> {
        self.filenames.get(id as usize).map(String::as_str)
    }

    /// Section layout in file order: header, function_table, string_table,
    /// filename_table, bytecode, epilogue.
    pub fn sections(&self) -> &[SectionRange] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<SectionRange> {
        self.sections.iter().copied().find(|s| s.name == name)
    }

    /// File offset of the first byte of the bytecode segment.
    pub fn bytecode_offset(&self) -> usize {
        self.section("bytecode").map(|s| s.start).unwrap_or_default()
    }

    pub fn bytecode(&self) -> &[u8] {
        match self.section("bytecode") {
            Some(s) => &self.bytes[s.start..s.end],
            None => &[],
        }
    }

    pub fn epilogue(&self) -> &[u8] {
        match self.section("epilogue") {
            Some(s) => &self.bytes[s.start..s.end],
            None => &[],
        }
    }

    /// Id of the function whose body contains `virtual_offset`.
    pub fn function_at_virtual_offset(&self, virtual_offset: u32) -> Option<u32> {
        self.functions
            .iter()
            .position(|f| f.contains(virtual_offset))
            .map(|idx| idx as u32)
    }
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, section: &'static str, len: usize) -> Result<&'a [u8], LoadError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(LoadError::Truncated {
                section,
                offset: self.pos,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, LoadError> {
        let raw = self.take(section, 4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn u64(&mut self, section: &'static str) -> Result<u64, LoadError> {
        let raw = self.take(section, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(u64::from_le_bytes(buf))
    }

    fn string_table(&mut self, section: &'static str, count: u32) -> Result<Vec<String>, LoadError> {
        let mut out = Vec::new();
        for index in 0..count {
            let len = self.u32(section)? as usize;
            let raw = self.take(section, len)?;
            let text = std::str::from_utf8(raw)
                .map_err(|_| LoadError::InvalidUtf8 { section, index })?;
            out.push(text.to_string());
        }
        Ok(out)
    }
}
