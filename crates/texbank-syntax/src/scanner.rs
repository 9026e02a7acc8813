//! Balanced-delimiter scanning.
//!
//! [`match_delimiter`] is the single routine that pairs `{`/`}` and `[`/`]`
//! in this workspace. Extractors locate an opening delimiter and ask it for
//! the closing one instead of counting braces on their own, which is what
//! keeps nested arguments such as `\dfrac{a}{b}` inside answer text intact.
//!
//! The helpers below answer the other questions extractors ask: whether an
//! offset is inside a `%` comment, where the real invocations of `\name`
//! are, and how many groups enclose an offset.

use crate::diagnostic::{DiagnosticKind, ParseDiagnostic};

/// Finds the delimiter that closes the one at `open_pos`.
///
/// Scanning starts right after `open_pos` with a balance of one. A backslash
/// escapes the character after it, so `\{` and `\}` never count. An
/// unescaped `%` skips everything up to the next newline. The returned
/// position is the byte offset of the `close` character that brings the
/// balance back to zero.
///
/// # Errors
///
/// Returns [`DiagnosticKind::UnbalancedBraces`] (or
/// [`DiagnosticKind::UnbalancedBrackets`] when `open` is `[`) positioned at
/// `open_pos` if the input ends first.
///
/// # Panics
///
/// Panics if `source[open_pos..]` does not start with `open`. That is a
/// caller bug, not bad input.
///
/// # Examples
///
/// ```
/// use texbank_syntax::scanner::match_delimiter;
///
/// let src = r"{$\dfrac{a}{b}$ \} }";
/// assert_eq!(match_delimiter(src, 0, '{', '}').unwrap(), src.len() - 1);
/// ```
pub fn match_delimiter(
    source: &str,
    open_pos: usize,
    open: char,
    close: char,
) -> Result<usize, ParseDiagnostic> {
    assert!(
        source.get(open_pos..).is_some_and(|rest| rest.starts_with(open)),
        "match_delimiter: no {open:?} at byte {open_pos}"
    );

    let mut balance = 1usize;
    let mut escaped = false;
    let mut in_comment = false;
    let body_start = open_pos + open.len_utf8();

    for (offset, c) in source[body_start..].char_indices() {
        let pos = body_start + offset;
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '%' => in_comment = true,
            c if c == open => balance += 1,
            c if c == close => {
                balance -= 1;
                if balance == 0 {
                    return Ok(pos);
                }
            }
            _ => {}
        }
    }

    let kind = if open == '[' {
        DiagnosticKind::UnbalancedBrackets
    } else {
        DiagnosticKind::UnbalancedBraces
    };
    log::trace!("unclosed {open:?} at byte {open_pos} (depth {balance} at end of input)");
    Err(ParseDiagnostic::new(
        kind,
        format!("`{open}` is never closed"),
    )
    .at(open_pos))
}

/// Returns the byte index of the first unescaped `%` in `line`, if any.
pub fn comment_start(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '%' => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Reports whether byte offset `pos` falls inside a `%` line comment.
pub fn is_in_comment(source: &str, pos: usize) -> bool {
    let line_start = source[..pos].rfind('\n').map_or(0, |nl| nl + 1);
    comment_start(&source[line_start..pos]).is_some()
}

/// Removes `%` comments. Lines that held nothing but a comment are dropped
/// entirely; other lines lose the comment and any trailing whitespace.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        match comment_start(body) {
            Some(idx) => {
                let kept = body[..idx].trim_end();
                if kept.trim_start().is_empty() {
                    continue;
                }
                out.push_str(kept);
                out.push_str(newline);
            }
            None => {
                out.push_str(body);
                out.push_str(newline);
            }
        }
    }
    out
}

/// Advances past whitespace starting at `pos`.
pub fn skip_whitespace(source: &str, pos: usize) -> usize {
    let rest = &source[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

/// Byte offsets of every invocation of `command` (written with its leading
/// backslash) that is not commented out.
///
/// A match only counts when the command name ends there, so searching for
/// `\choice` does not stop inside `\choiceTF`, and a match preceded by an
/// escaping backslash (`\\choice` is a line break followed by text) is
/// ignored.
pub fn command_positions<'a>(source: &'a str, command: &'a str) -> impl Iterator<Item = usize> + 'a {
    source
        .match_indices(command)
        .map(|(pos, _)| pos)
        .filter(move |&pos| is_invocation(source, pos, command))
}

/// Checks that the literal `command` found at `pos` is a live invocation.
pub fn is_invocation(source: &str, pos: usize, command: &str) -> bool {
    if command.is_empty() {
        return false;
    }
    let end = pos + command.len();
    let name_continues = command.chars().last().is_some_and(char::is_alphabetic)
        && source[end..].chars().next().is_some_and(char::is_alphabetic);
    !name_continues && !is_escaped(source, pos) && !is_in_comment(source, pos)
}

/// Number of `{...}` groups that enclose byte offset `pos`.
///
/// Uses the same escaping and comment rules as [`match_delimiter`]. Stray
/// closing braces never take the depth below zero.
pub fn group_depth(source: &str, pos: usize) -> usize {
    let mut depth = 0usize;
    let mut escaped = false;
    let mut in_comment = false;
    for c in source[..pos].chars() {
        if in_comment {
            in_comment = c != '\n';
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '%' => in_comment = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// True when the character at `pos` is preceded by an odd run of backslashes.
fn is_escaped(source: &str, pos: usize) -> bool {
    let run = source[..pos].bytes().rev().take_while(|&b| b == b'\\').count();
    run % 2 == 1
}
