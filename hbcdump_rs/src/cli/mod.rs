//! Interactive shell.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │            argv ──► config::Args ──► DumpConfig              │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ entrypoint::run: load module, source map, profile            │
//! │   --show-section-ranges ──► SectionWalker, exit              │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ repl::CommandLoop                                            │
//! │   startup script, then "hbcdump> " prompt per line           │
//! │        │                                                     │
//! │        ▼                                                     │
//! │ tokenizer ──► dispatch::Dispatcher ──► COMMANDS table        │
//! │                    │                                         │
//! │        ┌───────────┴────────────┐                            │
//! │        ▼                        ▼                            │
//! │   Disassembly              Analysis                          │
//! │   (OptionsOverride)        (profile, tables)                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - [`tokenizer`] - line splitting and integer arguments
//! - [`command`] - command table (names, aliases, arity, switches)
//! - [`help`] - help registry over the command table
//! - [`dispatch`] - one line to one operation or one error
//! - [`repl`] - startup script and prompt loop
//! - [`config`] - clap flags and [`DumpConfig`]
//! - [`entrypoint`] - loading and exit codes

pub mod command;
pub mod config;
pub mod dispatch;
pub mod entrypoint;
pub mod help;
mod help_texts;
pub mod repl;
pub mod tokenizer;

pub use command::{ArgKind, Arity, COMMANDS, CommandKind, CommandSpec, find_command};
pub use config::{AnalyzeMode, Args, DumpConfig};
pub use dispatch::{CommandError, Dispatcher, Flow};
pub use entrypoint::{StartupError, run};
pub use repl::{CommandLoop, LineSource, LoopEnd};
