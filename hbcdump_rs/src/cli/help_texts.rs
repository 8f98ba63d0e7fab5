//! Static help text constants for shell commands.
//!
//! Each constant ends with a newline and is printed verbatim.

pub(super) const TOP_LEVEL_HELP: &str =
    "These commands are defined internally. Type `help' to see this list.
Type `help name' to find out more about the function `name'.

";

pub(super) const FUNCTION_HELP: &str = "'function': Compute the runtime instruction frequency for each function and display in descending order. Each function name is displayed together with its source code line number.

'function <FUNC_ID>': Dump basic block stats for function with id <FUNC_ID>.

'function -used': List all invoked function IDs, one per line.

USAGE: function [<FUNC_ID> | -used]
       fun [<FUNC_ID> | -used]
";

pub(super) const INSTRUCTION_HELP: &str = "Computes the runtime instruction frequency for each instruction and displays it in descending order.

USAGE: instruction
       inst
";

pub(super) const DISASSEMBLE_HELP: &str = "'disassemble': Display bytecode disassembled output of whole binary.
'disassemble <FUNC_ID>': Display bytecode disassembled output of function with id <FUNC_ID>.
Add the '-offsets' flag to show virtual offsets for all instructions.

USAGE: disassemble [<FUNC_ID>] [-offsets]
       dis [<FUNC_ID>] [-offsets]
";

pub(super) const SUMMARY_HELP: &str = "Display overall summary information.

USAGE: summary
       sum
";

pub(super) const IO_HELP: &str = "Visualize function page I/O access working set in basic block profile trace.

USAGE: io
";

pub(super) const BLOCK_HELP: &str = "Display top hot basic blocks in sorted order.

USAGE: block
";

pub(super) const AT_VIRTUAL_HELP: &str = "Display information about the function at a given virtual offset.

USAGE: at-virtual <OFFSET>
       at_virtual <OFFSET>
";

pub(super) const HELP_HELP: &str = "Help instructions for hbcdump tool commands.

USAGE: help [<COMMAND>]
       h [<COMMAND>]
";

pub(super) const FUNCTION_INFO_HELP: &str = "Display info about a specific function, or all functions

USAGE: function-info [<FUNC_ID>]
NOTE: Virtual offset is the offset from the beginning of the segment
";

pub(super) const STRING_HELP: &str = "Display string for ID

USAGE: string <STRING_ID>
       str <STRING_ID>
";

pub(super) const FILENAME_HELP: &str = "Display file name for ID

USAGE: filename <FILENAME_ID>
";

pub(super) const EPILOGUE_HELP: &str = "Dump the epilogue.

USAGE: epilogue
       epi
";

pub(super) const QUIT_HELP: &str = "Leave the interactive shell. End of input has the same effect.

USAGE: quit
";
