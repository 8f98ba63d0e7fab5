//! Interactive command loop.

use std::io::{self, BufRead, Write};

use tracing::debug;

use super::dispatch::{Dispatcher, Flow};
use crate::disasm::{Disassembly, DisassemblyFormat, DisassemblyOptions};
use crate::profile::Analysis;

pub const PROMPT: &str = "hbcdump> ";

/// Blocking source of command lines.
pub trait LineSource {
    /// Next line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

impl<R: BufRead> LineSource for R {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            match BufRead::read_line(self, &mut line) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\n', '\r']).len();
                    line.truncate(trimmed);
                    return Ok(Some(line));
                }
                // A signal interrupted the read; the stream is not exhausted.
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    Quit,
    EndOfInput,
}

/// Split a `;`-delimited startup script. Only a trailing empty piece is dropped.
pub fn split_startup_commands(script: &str) -> Vec<String> {
    let mut commands: Vec<String> = script.split(';').map(str::to_string).collect();
    if commands.last().is_some_and(String::is_empty) {
        commands.pop();
    }
    commands
}

pub struct CommandLoop<'a, D: Disassembly + ?Sized, A: Analysis + ?Sized> {
    dispatcher: Dispatcher<'a, D, A>,
}

impl<'a, D: Disassembly + ?Sized, A: Analysis + ?Sized> CommandLoop<'a, D, A> {
    /// Seed the session options for `format` and take the collaborators.
    pub fn new(disassembler: &'a mut D, analyzer: &'a A, format: DisassemblyFormat) -> Self {
        disassembler.set_options(DisassemblyOptions::session_default(format));
        Self {
            dispatcher: Dispatcher::new(disassembler, analyzer),
        }
    }

    pub fn options(&self) -> DisassemblyOptions {
        self.dispatcher.options()
    }

    /// Run `startup` in order, then prompt for lines from `input`.
    ///
    /// Every startup entry runs exactly once. A `quit` among them skips the
    /// interactive phase, so `input` is then never read.
    pub fn run(
        &mut self,
        startup: &[String],
        input: &mut dyn LineSource,
        out: &mut dyn Write,
    ) -> io::Result<LoopEnd> {
        let mut quit = false;
        for command in startup {
            debug!(command = %command, "startup command");
            if self.dispatcher.execute(command, out)? == Flow::Quit {
                quit = true;
            }
        }
        if quit {
            out.flush()?;
            return Ok(LoopEnd::Quit);
        }

        loop {
            out.write_all(PROMPT.as_bytes())?;
            out.flush()?;
            let Some(line) = input.next_line()? else {
                return Ok(LoopEnd::EndOfInput);
            };
            if self.dispatcher.execute(&line, out)? == Flow::Quit {
                out.flush()?;
                return Ok(LoopEnd::Quit);
            }
        }
    }
}
