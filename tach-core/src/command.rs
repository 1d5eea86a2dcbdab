//! Console command grammar.
//!
//! Lines are a keyword optionally followed by one argument:
//!
//! ```text
//! run <script>    queue a script (also accepted as a bare script name)
//! status          print the latest duty and speed
//! scripts         list script names
//! help            list commands
//! ```
//!
//! Parsing is a small `winnow` grammar over `&str`; interpretation of the
//! words happens afterwards so errors can name the offending word.

use core::fmt;

use winnow::ModalResult;
use winnow::ascii::{space0, space1};
use winnow::combinator::{delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::scripts::ScriptKind;

/// Help text, one entry per command.
pub const HELP_LINES: [&str; 4] = [
    "run <script>  - run a drive script (idle, full-speed, half-speed, bang-bang, ramp, staircase)",
    "status        - print the latest Duty/Speed reading",
    "scripts       - list available scripts",
    "help          - show this help",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Run(ScriptKind),
    Status,
    Scripts,
    Help,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandError<'a> {
    /// Nothing but whitespace.
    Empty,
    /// The line is not a keyword followed by at most one word.
    Syntax(&'a str),
    UnknownCommand(&'a str),
    UnknownScript(&'a str),
    MissingScript,
    UnexpectedArgument(&'a str),
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::Syntax(rest) => write!(f, "unexpected input `{rest}`"),
            CommandError::UnknownCommand(word) => write!(f, "unknown command `{word}`"),
            CommandError::UnknownScript(word) => write!(f, "unknown script `{word}`"),
            CommandError::MissingScript => f.write_str("expected a script name after `run`"),
            CommandError::UnexpectedArgument(word) => write!(f, "unexpected argument `{word}`"),
        }
    }
}

fn word<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse_next(input)
}

fn request<'s>(input: &mut &'s str) -> ModalResult<(&'s str, Option<&'s str>)> {
    delimited(space0, (word, opt(preceded(space1, word))), space0).parse_next(input)
}

/// Parses one console line. A trailing `\r` or `\n` is ignored.
///
/// # Errors
///
/// Returns the [`CommandError`] describing why `line` is not a command.
pub fn parse(line: &str) -> Result<Command, CommandError<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(CommandError::Empty);
    }

    let mut input = line;
    let (keyword, argument) = request
        .parse_next(&mut input)
        .map_err(|_| CommandError::Syntax(line.trim_start()))?;
    if !input.is_empty() {
        return Err(CommandError::Syntax(input));
    }

    let no_argument = |command: Command| match argument {
        Some(extra) => Err(CommandError::UnexpectedArgument(extra)),
        None => Ok(command),
    };

    if keyword.eq_ignore_ascii_case("run") {
        let name = argument.ok_or(CommandError::MissingScript)?;
        return ScriptKind::from_name(name)
            .map(Command::Run)
            .ok_or(CommandError::UnknownScript(name));
    }
    if keyword.eq_ignore_ascii_case("status") {
        return no_argument(Command::Status);
    }
    if keyword.eq_ignore_ascii_case("scripts") {
        return no_argument(Command::Scripts);
    }
    if keyword.eq_ignore_ascii_case("help") {
        return no_argument(Command::Help);
    }

    match ScriptKind::from_name(keyword) {
        Some(kind) => no_argument(Command::Run(kind)),
        None => Err(CommandError::UnknownCommand(keyword)),
    }
}
