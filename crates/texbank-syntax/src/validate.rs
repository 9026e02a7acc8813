use crate::diagnostic::{DiagnosticKind, ParseDiagnostic, Severity};
use crate::lexer::{Lexer, Token};
use crate::SyntaxKind;

/// Document-wide structural checks run before any question is extracted.
///
/// ## Algorithm
///
/// The validator walks the [`Lexer`] token stream once and keeps three
/// stacks:
///
/// 1. **Braces**: every `{` is pushed and every `}` pops. Escaped braces are
///    commands and never reach the stack.
/// 2. **Brackets**: same as braces, but only outside math (`$...$`,
///    `$$...$$`, `\(...\)`, `\[...\]`) where half-open intervals like
///    `[0;1)` are ordinary notation. A blank line ends math the way it
///    ends a paragraph, so a stray `$` cannot hide the rest of the document.
/// 3. **Environments**: `\begin{name}` pushes `name`, `\end{name}` pops and
///    compares.
///
/// Brace and bracket problems are structural ([`Severity::Error`]); the
/// question source cannot be trusted span by span after one of them.
/// Environment problems are reported as
/// [`DiagnosticKind::MissingEnvironment`] warnings.
///
/// All problems are collected instead of stopping at the first one, and are
/// returned in document order.
///
/// ## Examples
///
/// ```
/// use texbank_syntax::validate::DocumentValidator;
///
/// let mut validator = DocumentValidator::new();
/// validator.validate("\\begin{ex}\\choice\n{a\n\\end{ex}");
///
/// assert!(validator.has_fatal());
/// assert_eq!(validator.diagnostics().len(), 1);
/// ```
pub struct DocumentValidator {
    diagnostics: Vec<ParseDiagnostic>,
}

impl DocumentValidator {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Validates `source`, appending any problems found to this validator.
    pub fn validate(&mut self, source: &str) {
        let tokens: Vec<Token<'_>> = Lexer::new(source).collect();
        let mut braces: Vec<usize> = Vec::new();
        let mut brackets: Vec<usize> = Vec::new();
        let mut environments: Vec<(&str, usize)> = Vec::new();
        let mut math_closer: Option<&str> = None;
        let mut found = Vec::new();

        for (idx, token) in tokens.iter().enumerate() {
            match token.kind {
                SyntaxKind::LBrace => braces.push(token.offset),
                SyntaxKind::RBrace => {
                    if braces.pop().is_none() {
                        found.push(unmatched_close(DiagnosticKind::UnbalancedBraces, '}', token.offset));
                    }
                }
                SyntaxKind::LBracket if math_closer.is_none() => brackets.push(token.offset),
                SyntaxKind::RBracket if math_closer.is_none() => {
                    if brackets.pop().is_none() {
                        found.push(unmatched_close(DiagnosticKind::UnbalancedBrackets, ']', token.offset));
                    }
                }
                SyntaxKind::Dollar | SyntaxKind::Command => {
                    match math_closer {
                        Some(closer) if closer == token.text => math_closer = None,
                        Some(_) => {}
                        None => math_closer = math_closer_for(token.text),
                    }
                    if token.kind == SyntaxKind::Command {
                        check_environment(&tokens, idx, &mut environments, &mut found);
                    }
                }
                SyntaxKind::Whitespace if math_closer.is_some() && is_paragraph_break(token.text) => {
                    log::trace!("math left open at paragraph break, byte {}", token.offset);
                    math_closer = None;
                }
                _ => {}
            }
        }

        for offset in braces {
            found.push(unclosed(DiagnosticKind::UnbalancedBraces, '{', offset));
        }
        for offset in brackets {
            found.push(unclosed(DiagnosticKind::UnbalancedBrackets, '[', offset));
        }
        for (name, offset) in environments {
            found.push(
                ParseDiagnostic::new(
                    DiagnosticKind::MissingEnvironment,
                    format!("`\\begin{{{name}}}` is never closed"),
                )
                .with_severity(Severity::Warning)
                .at(offset),
            );
        }

        found.sort_by_key(|d| d.position);
        if !found.is_empty() {
            log::debug!("validation found {} problem(s)", found.len());
        }
        self.diagnostics.extend(found);
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<ParseDiagnostic> {
        self.diagnostics
    }

    /// True if a structural problem was found.
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(ParseDiagnostic::is_fatal)
    }

    /// The earliest structural problem in document order.
    pub fn first_fatal(&self) -> Option<&ParseDiagnostic> {
        self.diagnostics.iter().find(|d| d.is_fatal())
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a fresh [`DocumentValidator`] over `source`.
pub fn validate_document(source: &str) -> Vec<ParseDiagnostic> {
    let mut validator = DocumentValidator::new();
    validator.validate(source);
    validator.into_diagnostics()
}

/// Tracks `\begin{name}`/`\end{name}` nesting. An `\end` whose name is open
/// further down the stack closes everything above it, and each environment
/// skipped that way is reported once.
fn check_environment<'a>(
    tokens: &[Token<'a>],
    idx: usize,
    environments: &mut Vec<(&'a str, usize)>,
    found: &mut Vec<ParseDiagnostic>,
) {
    let command = tokens[idx];
    if command.text != "\\begin" && command.text != "\\end" {
        return;
    }
    let Some(name) = environment_name(&tokens[idx + 1..]) else {
        return;
    };

    if command.text == "\\begin" {
        environments.push((name, command.offset));
        return;
    }

    let Some(depth) = environments.iter().rposition(|(open, _)| *open == name) else {
        found.push(
            ParseDiagnostic::new(
                DiagnosticKind::MissingEnvironment,
                format!("`\\end{{{name}}}` has no `\\begin`"),
            )
            .with_severity(Severity::Warning)
            .at(command.offset),
        );
        return;
    };
    for (open, open_offset) in environments.drain(depth + 1..) {
        found.push(
            ParseDiagnostic::new(
                DiagnosticKind::MissingEnvironment,
                format!("`\\begin{{{open}}}` is closed by `\\end{{{name}}}`"),
            )
            .with_severity(Severity::Warning)
            .at(open_offset),
        );
    }
    environments.pop();
}

/// `{name}` directly after `\begin`/`\end`.
fn environment_name<'a>(rest: &[Token<'a>]) -> Option<&'a str> {
    match rest {
        [open, name, close, ..]
            if open.kind == SyntaxKind::LBrace
                && name.kind == SyntaxKind::Text
                && close.kind == SyntaxKind::RBrace =>
        {
            Some(name.text)
        }
        _ => None,
    }
}

fn math_closer_for(opener: &str) -> Option<&'static str> {
    match opener {
        "$" => Some("$"),
        "$$" => Some("$$"),
        "\\(" => Some("\\)"),
        "\\[" => Some("\\]"),
        _ => None,
    }
}

/// Two or more line breaks in one whitespace run.
fn is_paragraph_break(whitespace: &str) -> bool {
    whitespace.matches('\n').nth(1).is_some()
}

fn unclosed(kind: DiagnosticKind, open: char, offset: usize) -> ParseDiagnostic {
    ParseDiagnostic::new(kind, format!("`{open}` is never closed")).at(offset)
}

fn unmatched_close(kind: DiagnosticKind, close: char, offset: usize) -> ParseDiagnostic {
    ParseDiagnostic::new(kind, format!("`{close}` has no opening partner")).at(offset)
}
