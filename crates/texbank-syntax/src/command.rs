//! Command argument extraction.
//!
//! Finds each invocation of a command such as `\loigiai` or `\shortans` and
//! reads its arguments: zero or more optional `[...]` groups followed by
//! exactly one mandatory `{...}` group. Delimiters are paired with
//! [`match_delimiter`], so arguments may hold nested groups, escaped braces
//! and comments.
//!
//! ```
//! use texbank_syntax::command::extract_command_args;
//!
//! let src = r"\shortans[oly]{ $\dfrac{1}{2}$ }";
//! let args: Vec<_> = extract_command_args(src, r"\shortans")
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! assert_eq!(args[0].optional, vec!["oly"]);
//! assert_eq!(args[0].mandatory, r"$\dfrac{1}{2}$");
//! ```

use crate::diagnostic::{DiagnosticKind, ParseDiagnostic};
use crate::scanner::{is_invocation, match_delimiter, skip_whitespace};

/// One invocation of a command together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation<'a> {
    /// Byte offset of the command's backslash.
    pub position: usize,
    /// Contents of the `{...}` argument, trimmed.
    pub mandatory: &'a str,
    /// Contents of each `[...]` argument in order, trimmed.
    pub optional: Vec<&'a str>,
    /// Byte offset just past the closing `}`.
    pub end: usize,
}

/// Lazily walks the invocations of one command.
///
/// Yields `Err` for an invocation whose arguments cannot be read; iteration
/// then continues with the next occurrence.
pub struct CommandArgs<'a> {
    source: &'a str,
    command: &'a str,
    cursor: usize,
}

/// Iterates over every invocation of `command` (including its backslash) in `source`.
pub fn extract_command_args<'a>(source: &'a str, command: &'a str) -> CommandArgs<'a> {
    CommandArgs {
        source,
        command,
        cursor: 0,
    }
}

impl<'a> CommandArgs<'a> {
    fn read_arguments(&self, position: usize) -> Result<CommandInvocation<'a>, ParseDiagnostic> {
        let source = self.source;
        let (optional, cursor) = read_optional_groups(source, position + self.command.len())?;

        if !source[cursor..].starts_with('{') {
            return Err(ParseDiagnostic::new(
                DiagnosticKind::MalformedIdentifier,
                format!("`{}` is not followed by a `{{...}}` argument", self.command),
            )
            .at(position));
        }
        let close = match_delimiter(source, cursor, '{', '}')?;

        Ok(CommandInvocation {
            position,
            mandatory: source[cursor + 1..close].trim(),
            optional,
            end: close + 1,
        })
    }
}

impl<'a> Iterator for CommandArgs<'a> {
    type Item = Result<CommandInvocation<'a>, ParseDiagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.command.is_empty() {
            return None;
        }
        loop {
            let found = self.source.get(self.cursor..)?.find(self.command)?;
            let position = self.cursor + found;
            self.cursor = position + self.command.len();

            if !is_invocation(self.source, position, self.command) {
                continue;
            }

            let result = self.read_arguments(position);
            if let Ok(invocation) = &result {
                self.cursor = invocation.end;
            }
            return Some(result);
        }
    }
}

/// Reads consecutive `[...]` groups starting at `pos` (leading whitespace
/// allowed). Returns the trimmed contents and the offset of the first
/// non-whitespace character after the last group.
pub fn read_optional_groups(source: &str, pos: usize) -> Result<(Vec<&str>, usize), ParseDiagnostic> {
    let mut optional = Vec::new();
    let mut cursor = skip_whitespace(source, pos);
    while source[cursor..].starts_with('[') {
        let close = match_delimiter(source, cursor, '[', ']')?;
        optional.push(source[cursor + 1..close].trim());
        cursor = skip_whitespace(source, close + 1);
    }
    Ok((optional, cursor))
}

/// The first readable invocation of `command`, if any.
pub fn first_command_arg<'a>(source: &'a str, command: &'a str) -> Option<CommandInvocation<'a>> {
    extract_command_args(source, command).find_map(Result::ok)
}
