//! Command dispatcher.
//!
//! Turns one tokenized line into exactly one collaborator call or exactly one
//! reported error. Recoverable errors are rendered to the output sink and
//! never escape [`Dispatcher::execute`]; only sink I/O failures do.

use std::io::{self, Write};

use thiserror::Error;
use tracing::debug;

use super::command::{ArgKind, CommandKind, CommandSpec, find_command};
use super::help;
use super::tokenizer::{find_and_remove_one, parse_u32, tokenize};
use crate::disasm::{Disassembly, DisassemblyOptions, OptionsOverride};
use crate::error::InspectError;
use crate::profile::Analysis;

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Error: cannot parse {0} as integer.")]
    ParseInt(ArgKind),

    #[error("{0}")]
    Inspect(#[from] InspectError),

    #[error("Virtual offset {0} is invalid.")]
    InvalidVirtualOffset(u32),

    #[error("{}", .0.help)]
    Usage(&'static CommandSpec),

    #[error("{}", help::invalid_command_notice(.0))]
    UnknownCommand(String),
}

impl CommandError {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        match self {
            // Help texts carry their own trailing newline.
            CommandError::Usage(spec) => out.write_all(spec.help.as_bytes()),
            other => writeln!(out, "{other}"),
        }
    }
}

/// Successful outcome of one command.
enum Done {
    /// A collaborator produced output; a separator line follows.
    Output,
    /// Help was printed.
    Help,
    Quit,
}

pub struct Dispatcher<'a, D: Disassembly + ?Sized, A: Analysis + ?Sized> {
    disassembler: &'a mut D,
    analyzer: &'a A,
}

impl<'a, D: Disassembly + ?Sized, A: Analysis + ?Sized> Dispatcher<'a, D, A> {
    pub fn new(disassembler: &'a mut D, analyzer: &'a A) -> Self {
        Self {
            disassembler,
            analyzer,
        }
    }

    /// Session options of the underlying disassembler.
    pub fn options(&self) -> DisassemblyOptions {
        self.disassembler.options()
    }

    /// Tokenize and run one command line.
    pub fn execute(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        let tokens = tokenize(line);
        let Some((&word, args)) = tokens.split_first() else {
            return Ok(Flow::Continue);
        };

        match self.run(word, args.to_vec(), out) {
            Ok(Done::Output) => {
                writeln!(out)?;
                Ok(Flow::Continue)
            }
            Ok(Done::Help) => Ok(Flow::Continue),
            Ok(Done::Quit) => Ok(Flow::Quit),
            Err(CommandError::Inspect(InspectError::Io(err))) => Err(err),
            Err(err) => {
                debug!(command = word, error = ?err, "command failed");
                err.render(out)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn run(&mut self, word: &str, mut args: Vec<&str>, out: &mut dyn Write) -> Result<Done, CommandError> {
        let spec = find_command(word).ok_or_else(|| CommandError::UnknownCommand(word.to_string()))?;
        let switched = spec
            .switch
            .is_some_and(|switch| find_and_remove_one(&mut args, switch));
        debug!(command = spec.name, switched, args = ?args, "dispatch");

        if spec.kind == CommandKind::Function && switched {
            self.analyzer.dump_used_function_ids(out)?;
            return Ok(Done::Output);
        }

        let arg = spec.arity.accepts(&args).ok_or(CommandError::Usage(spec))?;
        let number = |kind: ArgKind| -> Result<Option<u32>, CommandError> {
            arg.map(|token| parse_u32(token).ok_or(CommandError::ParseInt(kind)))
                .transpose()
        };

        match spec.kind {
            CommandKind::Function => match number(ArgKind::FuncId)? {
                Some(id) => self.analyzer.dump_function_basic_block_stat(id, out)?,
                None => self.analyzer.dump_function_stats(out)?,
            },
            CommandKind::Instruction => self.analyzer.dump_instruction_stats(out)?,
            CommandKind::Disassemble => {
                let extra = if switched {
                    DisassemblyOptions::INCLUDE_VIRTUAL_OFFSETS
                } else {
                    DisassemblyOptions::empty()
                };
                let scoped = OptionsOverride::new(&mut *self.disassembler, extra);
                match number(ArgKind::FuncId)? {
                    Some(id) if id >= scoped.function_count() => {
                        return Err(InspectError::NoSuchFunction(id).into());
                    }
                    Some(id) => scoped.disassemble_function(id, out)?,
                    None => scoped.disassemble(out)?,
                }
            }
            CommandKind::String => {
                let id = number(ArgKind::StringId)?.ok_or(CommandError::Usage(spec))?;
                self.analyzer.dump_string(id, out)?;
            }
            CommandKind::Filename => {
                let id = number(ArgKind::FilenameId)?.ok_or(CommandError::Usage(spec))?;
                self.analyzer.dump_file_name(id, out)?;
            }
            CommandKind::FunctionInfo => match number(ArgKind::FuncId)? {
                Some(id) => self.analyzer.dump_function_info(id, out)?,
                None => self.analyzer.dump_all_function_info(out)?,
            },
            CommandKind::Io => self.analyzer.dump_io(out)?,
            CommandKind::Summary => self.analyzer.dump_summary(out)?,
            CommandKind::Block => self.analyzer.dump_basic_block_stats(out)?,
            CommandKind::AtVirtual => {
                let offset = number(ArgKind::VirtualOffset)?.ok_or(CommandError::Usage(spec))?;
                let id = self
                    .analyzer
                    .function_from_virtual_offset(offset)
                    .ok_or(CommandError::InvalidVirtualOffset(offset))?;
                self.analyzer.dump_function_info(id, out)?;
            }
            CommandKind::Epilogue => self.analyzer.dump_epilogue(out)?,
            CommandKind::Help => {
                help::write_help(out, arg).map_err(InspectError::Io)?;
                return Ok(Done::Help);
            }
            CommandKind::Quit => return Ok(Done::Quit),
        }
        Ok(Done::Output)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::disasm::DisassemblyFormat;
    use crate::error::InspectResult;

    type Log = Rc<RefCell<Vec<String>>>;

    struct FakeDisassembler {
        options: DisassemblyOptions,
        log: Log,
    }

    impl Disassembly for FakeDisassembler {
        fn options(&self) -> DisassemblyOptions {
            self.options
        }
        fn set_options(&mut self, options: DisassemblyOptions) {
            self.options = options;
        }
        fn function_count(&self) -> u32 {
            3
        }
        fn disassemble(&self, out: &mut dyn Write) -> InspectResult {
            self.log
                .borrow_mut()
                .push(format!("disassemble {:?}", self.options));
            writeln!(out, "<module>")?;
            Ok(())
        }
        fn disassemble_function(&self, id: u32, out: &mut dyn Write) -> InspectResult {
            self.log
                .borrow_mut()
                .push(format!("disassemble_function {id} {:?}", self.options));
            writeln!(out, "<function {id}>")?;
            Ok(())
        }
    }

    struct FakeAnalyzer {
        log: Log,
    }

    impl FakeAnalyzer {
        fn record(&self, call: String, out: &mut dyn Write) -> InspectResult {
            writeln!(out, "<{call}>")?;
            self.log.borrow_mut().push(call);
            Ok(())
        }
    }

    impl Analysis for FakeAnalyzer {
        fn dump_function_stats(&self, out: &mut dyn Write) -> InspectResult {
            self.record("function_stats".into(), out)
        }
        fn dump_used_function_ids(&self, out: &mut dyn Write) -> InspectResult {
            self.record("used_function_ids".into(), out)
        }
        fn dump_function_basic_block_stat(&self, id: u32, out: &mut dyn Write) -> InspectResult {
            self.record(format!("function_basic_block_stat {id}"), out)
        }
        fn dump_instruction_stats(&self, out: &mut dyn Write) -> InspectResult {
            self.record("instruction_stats".into(), out)
        }
        fn dump_io(&self, out: &mut dyn Write) -> InspectResult {
            self.record("io".into(), out)
        }
        fn dump_basic_block_stats(&self, out: &mut dyn Write) -> InspectResult {
            self.record("basic_block_stats".into(), out)
        }
        fn dump_string(&self, id: u32, out: &mut dyn Write) -> InspectResult {
            if id > 0 {
                return Err(InspectError::NoSuchString(id));
            }
            self.record(format!("string {id}"), out)
        }
        fn dump_file_name(&self, id: u32, out: &mut dyn Write) -> InspectResult {
            self.record(format!("file_name {id}"), out)
        }
        fn dump_function_info(&self, id: u32, out: &mut dyn Write) -> InspectResult {
            self.record(format!("function_info {id}"), out)
        }
        fn dump_all_function_info(&self, out: &mut dyn Write) -> InspectResult {
            self.record("all_function_info".into(), out)
        }
        fn dump_summary(&self, out: &mut dyn Write) -> InspectResult {
            self.record("summary".into(), out)
        }
        fn function_from_virtual_offset(&self, virtual_offset: u32) -> Option<u32> {
            (virtual_offset < 0x40).then_some(virtual_offset / 0x20)
        }
        fn dump_epilogue(&self, out: &mut dyn Write) -> InspectResult {
            self.record("epilogue".into(), out)
        }
    }

    struct Harness {
        disassembler: FakeDisassembler,
        analyzer: FakeAnalyzer,
        log: Log,
    }

    impl Harness {
        fn new() -> Self {
            let log = Log::default();
            Self {
                disassembler: FakeDisassembler {
                    options: DisassemblyOptions::session_default(DisassemblyFormat::Pretty),
                    log: log.clone(),
                },
                analyzer: FakeAnalyzer { log: log.clone() },
                log,
            }
        }

        /// Run one line; returns (flow, output, calls made by it).
        fn exec(&mut self, line: &str) -> (Flow, String, Vec<String>) {
            let mut out = Vec::new();
            let flow = Dispatcher::new(&mut self.disassembler, &self.analyzer)
                .execute(line, &mut out)
                .unwrap();
            let calls = self.log.borrow_mut().drain(..).collect();
            (flow, String::from_utf8(out).unwrap(), calls)
        }
    }

    #[test]
    fn empty_line_is_a_no_op() {
        let mut h = Harness::new();
        for line in ["", "   "] {
            let (flow, out, calls) = h.exec(line);
            assert_eq!(flow, Flow::Continue);
            assert_eq!(out, "");
            assert!(calls.is_empty());
        }
    }

    #[test]
    fn used_switch_wins_over_function_stats() {
        let mut h = Harness::new();
        let (_, out, calls) = h.exec("function -used");
        assert_eq!(calls, vec!["used_function_ids"]);
        assert_eq!(out, "<used_function_ids>\n\n");

        let (_, _, calls) = h.exec("fun");
        assert_eq!(calls, vec!["function_stats"]);

        let (_, _, calls) = h.exec("function 0x2");
        assert_eq!(calls, vec!["function_basic_block_stat 2"]);
    }

    #[test]
    fn offsets_switch_is_scoped_to_one_command() {
        let mut h = Harness::new();
        let before = h.disassembler.options;

        for line in ["dis -offsets 1", "disassemble 1 -offsets"] {
            let (_, out, calls) = h.exec(line);
            assert_eq!(out, "<function 1>\n\n");
            assert_eq!(
                calls,
                vec![format!(
                    "disassemble_function 1 {:?}",
                    before | DisassemblyOptions::INCLUDE_VIRTUAL_OFFSETS
                )]
            );
            assert_eq!(h.disassembler.options, before);
        }

        let (_, _, calls) = h.exec("dis");
        assert_eq!(calls, vec![format!("disassemble {before:?}")]);
    }

    #[test]
    fn disassemble_out_of_range_leaves_options_untouched() {
        let mut h = Harness::new();
        let before = h.disassembler.options;
        let (flow, out, calls) = h.exec("disassemble 9999 -offsets");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "Error: no function with id: 9999 exists.\n");
        assert!(calls.is_empty());
        assert_eq!(h.disassembler.options, before);
    }

    #[test]
    fn parse_errors_name_the_argument_kind() {
        let mut h = Harness::new();
        for (line, kind) in [
            ("string abc", "string_id"),
            ("function x", "func_id"),
            ("dis 1x", "func_id"),
            ("filename -1", "filename_id"),
            ("function-info zz", "func_id"),
            ("at-virtual q", "virtual_offset"),
        ] {
            let (_, out, calls) = h.exec(line);
            assert_eq!(out, format!("Error: cannot parse {kind} as integer.\n"), "{line}");
            assert!(calls.is_empty(), "{line} reached a collaborator");
        }
    }

    #[test]
    fn arity_mismatch_prints_command_help() {
        let mut h = Harness::new();
        let (_, out, calls) = h.exec("instruction 3");
        assert!(out.starts_with("Computes the runtime instruction frequency"));
        assert!(calls.is_empty());

        let (_, out, _) = h.exec("str");
        assert!(out.contains("USAGE: string <STRING_ID>"));

        let (_, out, _) = h.exec("function 1 2");
        assert!(out.contains("USAGE: function [<FUNC_ID> | -used]"));
    }

    #[test]
    fn collaborator_errors_are_reported_once() {
        let mut h = Harness::new();
        let (_, out, calls) = h.exec("string 4");
        assert_eq!(out, "Error: no string with id: 4 exists.\n");
        assert!(calls.is_empty());

        let (_, out, calls) = h.exec("string 0");
        assert_eq!(out, "<string 0>\n\n");
        assert_eq!(calls, vec!["string 0"]);
    }

    #[test]
    fn at_virtual_resolves_then_dumps_info() {
        let mut h = Harness::new();
        let (_, _, calls) = h.exec("at_virtual 0x21");
        assert_eq!(calls, vec!["function_info 1"]);

        let (_, out, calls) = h.exec("at-virtual 4096");
        assert_eq!(out, "Virtual offset 4096 is invalid.\n");
        assert!(calls.is_empty());
    }

    #[test]
    fn every_simple_command_routes_to_one_call() {
        let mut h = Harness::new();
        for (line, call) in [
            ("inst", "instruction_stats"),
            ("io", "io"),
            ("sum", "summary"),
            ("block", "basic_block_stats"),
            ("epi", "epilogue"),
            ("function-info", "all_function_info"),
            ("function-info 2", "function_info 2"),
            ("filename 0", "file_name 0"),
        ] {
            let (flow, out, calls) = h.exec(line);
            assert_eq!(flow, Flow::Continue);
            assert_eq!(calls, vec![call.to_string()], "{line}");
            assert!(out.ends_with(">\n\n"), "{line}: {out:?}");
        }
    }

    #[test]
    fn help_and_unknown_commands() {
        let mut h = Harness::new();
        let (_, out, _) = h.exec("h str");
        assert_eq!(out, help::lookup("string").unwrap());

        let (_, out, calls) = h.exec("dissasemble 3");
        assert_eq!(out, "Invalid command: dissasemble. Did you mean 'disassemble'?\n");
        assert!(calls.is_empty());

        let (flow, out, _) = h.exec("help");
        assert_eq!(flow, Flow::Continue);
        assert!(out.ends_with("epilogue\nquit\n"));
    }

    #[test]
    fn only_quit_quits() {
        let mut h = Harness::new();
        let (flow, out, calls) = h.exec("quit");
        assert_eq!(flow, Flow::Quit);
        assert_eq!(out, "");
        assert!(calls.is_empty());
        assert_eq!(h.exec("  quit  ").0, Flow::Quit);

        let (flow, out, _) = h.exec("quit now 3");
        assert_eq!(flow, Flow::Quit);
        assert_eq!(out, "");
    }

    #[test]
    fn sink_failures_propagate() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut h = Harness::new();
        let mut dispatcher = Dispatcher::new(&mut h.disassembler, &h.analyzer);
        let err = dispatcher.execute("summary", &mut Closed).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        let err = dispatcher.execute("string abc", &mut Closed).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
