//! Shell command table.
//!
//! Every command is one [`CommandSpec`] row: canonical name, aliases, arity
//! policy, optional switch token and help text. The dispatcher and the help
//! registry both read this table, so an alias can never route somewhere its
//! help entry does not.

use std::fmt;

use strsim::levenshtein;

use super::help_texts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Function,
    Instruction,
    Disassemble,
    Summary,
    Io,
    Block,
    AtVirtual,
    Help,
    FunctionInfo,
    String,
    Filename,
    Epilogue,
    Quit,
}

/// What a positional argument denotes; used in parse error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    FuncId,
    StringId,
    FilenameId,
    VirtualOffset,
    /// Free text (the topic of `help`).
    CommandName,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::FuncId => "func_id",
            ArgKind::StringId => "string_id",
            ArgKind::FilenameId => "filename_id",
            ArgKind::VirtualOffset => "virtual_offset",
            ArgKind::CommandName => "command",
        })
    }
}

/// Positional arity, counted after the switch token has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Optional(ArgKind),
    Required(ArgKind),
    /// Trailing tokens are ignored.
    Ignored,
}

impl Arity {
    /// Accept `args` or report that the arity does not match.
    pub fn accepts<'t>(self, args: &[&'t str]) -> Option<Option<&'t str>> {
        match (self, args) {
            (Arity::Ignored, _) => Some(None),
            (Arity::None | Arity::Optional(_), []) => Some(None),
            (Arity::Optional(_) | Arity::Required(_), [arg]) => Some(Some(*arg)),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CommandSpec {
    pub kind: CommandKind,
    /// Canonical name; also the help key.
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub arity: Arity,
    /// Exact-match flag token stripped before the arity check.
    pub switch: Option<&'static str>,
    pub help: &'static str,
}

impl CommandSpec {
    pub fn matches(&self, word: &str) -> bool {
        self.name == word || self.aliases.contains(&word)
    }
}

/// All shell commands in help listing order.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::Function,
        name: "function",
        aliases: &["fun"],
        arity: Arity::Optional(ArgKind::FuncId),
        switch: Some("-used"),
        help: FUNCTION_HELP,
    },
    CommandSpec {
        kind: CommandKind::Instruction,
        name: "instruction",
        aliases: &["inst"],
        arity: Arity::None,
        switch: None,
        help: INSTRUCTION_HELP,
    },
    CommandSpec {
        kind: CommandKind::Disassemble,
        name: "disassemble",
        aliases: &["dis"],
        arity: Arity::Optional(ArgKind::FuncId),
        switch: Some("-offsets"),
        help: DISASSEMBLE_HELP,
    },
    CommandSpec {
        kind: CommandKind::Summary,
        name: "summary",
        aliases: &["sum"],
        arity: Arity::None,
        switch: None,
        help: SUMMARY_HELP,
    },
    CommandSpec {
        kind: CommandKind::Io,
        name: "io",
        aliases: &[],
        arity: Arity::None,
        switch: None,
        help: IO_HELP,
    },
    CommandSpec {
        kind: CommandKind::Block,
        name: "block",
        aliases: &[],
        arity: Arity::None,
        switch: None,
        help: BLOCK_HELP,
    },
    CommandSpec {
        kind: CommandKind::AtVirtual,
        name: "at-virtual",
        aliases: &["at_virtual"],
        arity: Arity::Required(ArgKind::VirtualOffset),
        switch: None,
        help: AT_VIRTUAL_HELP,
    },
    CommandSpec {
        kind: CommandKind::Help,
        name: "help",
        aliases: &["h"],
        arity: Arity::Optional(ArgKind::CommandName),
        switch: None,
        help: HELP_HELP,
    },
    CommandSpec {
        kind: CommandKind::FunctionInfo,
        name: "function-info",
        aliases: &[],
        arity: Arity::Optional(ArgKind::FuncId),
        switch: None,
        help: FUNCTION_INFO_HELP,
    },
    CommandSpec {
        kind: CommandKind::String,
        name: "string",
        aliases: &["str"],
        arity: Arity::Required(ArgKind::StringId),
        switch: None,
        help: STRING_HELP,
    },
    CommandSpec {
        kind: CommandKind::Filename,
        name: "filename",
        aliases: &[],
        arity: Arity::Required(ArgKind::FilenameId),
        switch: None,
        help: FILENAME_HELP,
    },
    CommandSpec {
        kind: CommandKind::Epilogue,
        name: "epilogue",
        aliases: &["epi"],
        arity: Arity::None,
        switch: None,
        help: EPILOGUE_HELP,
    },
    CommandSpec {
        kind: CommandKind::Quit,
        name: "quit",
        aliases: &[],
        arity: Arity::Ignored,
        switch: None,
        help: QUIT_HELP,
    },
];

/// Resolve a canonical name or alias (case-sensitive).
pub fn find_command(word: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(word))
}

/// Suggest a similar command name using Levenshtein distance.
/// Returns the canonical name of the closest command within distance 2.
pub fn suggest_similar_command(input: &str) -> Option<&'static str> {
    let input_lower = input.to_lowercase();
    let mut best_match: Option<(&'static str, usize)> = None;

    for spec in COMMANDS {
        for word in std::iter::once(&spec.name).chain(spec.aliases) {
            let distance = levenshtein(&input_lower, word);
            if distance > 2 {
                continue;
            }
            match best_match {
                Some((_, best)) if best <= distance => {}
                _ => best_match = Some((spec.name, distance)),
            }
        }
    }

    best_match.map(|(name, _)| name)
}
