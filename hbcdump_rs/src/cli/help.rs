//! Help registry.
//!
//! Help keys are the canonical command names from [`COMMANDS`]; the index is
//! built once on first use and never mutated.

use std::collections::HashMap;
use std::io::{self, Write};

use once_cell::sync::Lazy;

use super::command::{COMMANDS, find_command, suggest_similar_command};
use super::help_texts::TOP_LEVEL_HELP;

static HELP_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| COMMANDS.iter().map(|spec| (spec.name, spec.help)).collect());

/// Help text for an exact, case-sensitive help key.
pub fn lookup(name: &str) -> Option<&'static str> {
    HELP_INDEX.get(name).copied()
}

/// Every `(key, text)` pair, in command table order.
pub fn list_all() -> impl Iterator<Item = (&'static str, &'static str)> {
    COMMANDS.iter().map(|spec| (spec.name, spec.help))
}

/// Notice printed for a name that is neither a command nor an alias.
pub fn invalid_command_notice(name: &str) -> String {
    match suggest_similar_command(name) {
        Some(suggestion) => format!("Invalid command: {name}. Did you mean '{suggestion}'?"),
        None => format!("Invalid command: {name}"),
    }
}

/// Print the listing (no topic) or the entry for `topic`.
///
/// Aliases resolve to their canonical entry, so `help str` prints the
/// `string` text.
pub fn write_help(out: &mut dyn Write, topic: Option<&str>) -> io::Result<()> {
    let Some(topic) = topic.filter(|t| !t.is_empty()) else {
        out.write_all(TOP_LEVEL_HELP.as_bytes())?;
        for (name, _) in list_all() {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    };

    match find_command(topic).and_then(|spec| lookup(spec.name)) {
        Some(text) => out.write_all(text.as_bytes()),
        None => writeln!(out, "{}", invalid_command_notice(topic)),
    }
}
