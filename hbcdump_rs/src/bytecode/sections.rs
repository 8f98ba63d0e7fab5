//! Section range listing for `--show-section-ranges`.

use std::io::{self, Write};

use super::BytecodeModule;

/// Walks the section layout of a loaded module.
pub struct SectionWalker<'m> {
    module: &'m BytecodeModule,
}

impl<'m> SectionWalker<'m> {
    pub fn new(module: &'m BytecodeModule) -> Self {
        Self { module }
    }

    /// Print one line per section.
    ///
    /// Raw form is `<name> <start> <end>` in decimal, meant for scripts.
    /// Human form is `<name>: [0x<start>, 0x<end>) <len> bytes`.
    pub fn print_section_ranges(&self, out: &mut dyn Write, human: bool) -> io::Result<()> {
        for section in self.module.sections() {
            if human {
                writeln!(
                    out,
                    "{:<16}[{:#010x}, {:#010x}) {} bytes",
                    format!("{}:", section.name),
                    section.start,
                    section.end,
                    section.len()
                )?;
            } else {
                writeln!(out, "{} {} {}", section.name, section.start, section.end)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_module;

    #[test]
    fn raw_ranges_are_decimal_triples() {
        let module = sample_module();
        let mut out = Vec::new();
        SectionWalker::new(&module)
            .print_section_ranges(&mut out, false)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "header 0 32");
        assert_eq!(lines[1], "function_table 32 104");
        let last = format!("epilogue {} {}", module.file_size() - 13, module.file_size());
        assert_eq!(lines[5], last);
    }

    #[test]
    fn human_ranges_are_hex() {
        let module = sample_module();
        let mut out = Vec::new();
        SectionWalker::new(&module)
            .print_section_ranges(&mut out, true)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("header:         [0x00000000, 0x00000020) 32 bytes\n"));
        assert!(text.contains("function_table: [0x00000020, 0x00000068) 72 bytes"));
    }
}
