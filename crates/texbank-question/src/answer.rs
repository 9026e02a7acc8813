//! Answer lists of `\choice` and `\choiceTF` questions.
//!
//! The body after the choice command is read line by line:
//!
//! 1. comments are removed and blank lines dropped;
//! 2. a line cut inside a `\dfrac` numerator is merged with the next one
//!    (the split-fraction repair, reported as an informational diagnostic);
//! 3. a line that still opens more braces than it closes absorbs the
//!    following lines until it balances;
//! 4. a line made of several `{...}` groups (`{A}{B}{C}{D}`) yields one
//!    entry per group;
//! 5. each entry loses its wrapping braces and the correct-answer marker.

use texbank_syntax::lexer::Lexer;
use texbank_syntax::scanner::{comment_start, match_delimiter, skip_whitespace};
use texbank_syntax::{DiagnosticKind, ParseDiagnostic, Severity, SyntaxKind};

use crate::model::Answer;

const SPLIT_FRACTION: &str = "\\dfrac{";

/// Answers read from one choice body, with the problems met on the way.
/// Diagnostic positions are byte offsets into that body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerExtraction {
    pub answers: Vec<Answer>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

#[derive(Debug, Clone)]
pub struct AnswerExtractor<'a> {
    marker: &'a str,
    repair_split_fractions: bool,
}

/// A candidate answer and the body offset of its first line.
#[derive(Debug)]
struct Entry {
    offset: usize,
    text: String,
}

impl<'a> AnswerExtractor<'a> {
    pub fn new(marker: &'a str) -> Self {
        Self {
            marker,
            repair_split_fractions: true,
        }
    }

    pub fn repair_split_fractions(mut self, enabled: bool) -> Self {
        self.repair_split_fractions = enabled;
        self
    }

    pub fn extract(&self, body: &str) -> AnswerExtraction {
        let mut diagnostics = Vec::new();

        let lines = candidate_lines(body);
        let lines = if self.repair_split_fractions {
            repair_split_fractions(lines, &mut diagnostics)
        } else {
            lines
        };
        let entries = join_open_lines(lines, &mut diagnostics);

        let mut answers = Vec::new();
        for entry in entries {
            for text in split_groups(&entry.text) {
                let (content, is_correct) = self.clean(text);
                if content.is_empty() {
                    diagnostics.push(
                        ParseDiagnostic::new(
                            DiagnosticKind::MalformedAnswer,
                            format!("answer {} is empty", answers.len()),
                        )
                        .at(entry.offset),
                    );
                }
                answers.push(Answer::new(answers.len(), content, is_correct));
            }
        }

        AnswerExtraction {
            answers,
            diagnostics,
        }
    }

    /// Unwraps the entry, strips the marker, and unwraps again what the
    /// marker was wrapping, so `{\True{3}}` reads as `3`.
    fn clean(&self, text: &str) -> (String, bool) {
        let text = unwrap_braces(text.trim());
        match strip_marker(text, self.marker) {
            Some(rest) => (unwrap_braces(rest.trim()).to_string(), true),
            None => (text.to_string(), false),
        }
    }
}

/// Extracts answers with the default `\True` marker.
pub fn extract_answers(body: &str) -> AnswerExtraction {
    AnswerExtractor::new("\\True").extract(body)
}

/// Removes one layer of braces when the first `{` is closed by the last `}`.
///
/// `{a}{b}` is returned unchanged because its first brace closes early.
pub fn unwrap_braces(text: &str) -> &str {
    if !(text.starts_with('{') && text.ends_with('}')) {
        return text;
    }
    match match_delimiter(text, 0, '{', '}') {
        Ok(close) if close == text.len() - 1 => text[1..close].trim(),
        _ => text,
    }
}

/// Removes the first live `marker` from `text`. `None` if it is absent.
fn strip_marker(text: &str, marker: &str) -> Option<String> {
    if marker.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(found) = text[from..].find(marker) {
        let pos = from + found;
        let end = pos + marker.len();
        let continues = marker.chars().last().is_some_and(char::is_alphabetic)
            && text[end..].chars().next().is_some_and(char::is_alphabetic);
        if !continues {
            let mut out = String::with_capacity(text.len() - marker.len());
            out.push_str(&text[..pos]);
            out.push_str(&text[end..]);
            return Some(out);
        }
        from = end;
    }
    None
}

fn candidate_lines(body: &str) -> Vec<Entry> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in body.split_inclusive('\n') {
        let line = match comment_start(raw) {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let text = line.trim();
        if !text.is_empty() {
            lines.push(Entry {
                offset: offset + (line.len() - line.trim_start().len()),
                text: text.to_string(),
            });
        }
        offset += raw.len();
    }
    lines
}

/// True when the last `\dfrac{` of `line` never closes its numerator.
fn has_split_fraction(line: &str) -> bool {
    match line.rfind(SPLIT_FRACTION) {
        Some(idx) => {
            let brace = idx + SPLIT_FRACTION.len() - 1;
            match_delimiter(line, brace, '{', '}').is_err()
        }
        None => false,
    }
}

/// Merges a line that ends inside a `\dfrac` numerator with the line after
/// it, closing the numerator and opening the denominator in between. Only
/// two-line splits are repaired; a merged line is not inspected again.
fn repair_split_fractions(lines: Vec<Entry>, diagnostics: &mut Vec<ParseDiagnostic>) -> Vec<Entry> {
    let mut out = Vec::with_capacity(lines.len());
    let mut iter = lines.into_iter();
    while let Some(mut entry) = iter.next() {
        if has_split_fraction(&entry.text) {
            if let Some(next) = iter.next() {
                log::debug!("merging split fraction at body offset {}", entry.offset);
                entry.text = format!("{}}}{{{}", entry.text.trim_end(), next.text.trim_start());
                diagnostics.push(
                    ParseDiagnostic::new(
                        DiagnosticKind::MalformedAnswer,
                        "fraction split across two answer lines was merged",
                    )
                    .with_severity(Severity::Information)
                    .at(entry.offset),
                );
            }
        }
        out.push(entry);
    }
    out
}

/// Net `{` count of `text`; escaped braces do not count.
fn brace_depth(text: &str) -> i64 {
    Lexer::new(text).fold(0, |depth, token| match token.kind {
        SyntaxKind::LBrace => depth + 1,
        SyntaxKind::RBrace => depth - 1,
        _ => depth,
    })
}

fn join_open_lines(lines: Vec<Entry>, diagnostics: &mut Vec<ParseDiagnostic>) -> Vec<Entry> {
    let mut out = Vec::with_capacity(lines.len());
    let mut iter = lines.into_iter();
    while let Some(mut entry) = iter.next() {
        let mut depth = brace_depth(&entry.text);
        while depth > 0 {
            let Some(next) = iter.next() else { break };
            depth += brace_depth(&next.text);
            entry.text.push('\n');
            entry.text.push_str(&next.text);
        }
        if depth > 0 {
            diagnostics.push(
                ParseDiagnostic::new(
                    DiagnosticKind::MalformedAnswer,
                    "answer braces are still open at the end of the answer list",
                )
                .at(entry.offset),
            );
        }
        out.push(entry);
    }
    out
}

/// Splits `{A}{B}...` into its groups. Anything else is a single entry.
fn split_groups(text: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut pos = 0;
    loop {
        pos = skip_whitespace(text, pos);
        if pos == text.len() {
            break;
        }
        if !text[pos..].starts_with('{') {
            return vec![text];
        }
        match match_delimiter(text, pos, '{', '}') {
            Ok(close) => {
                groups.push(&text[pos..=close]);
                pos = close + 1;
            }
            Err(_) => return vec![text],
        }
    }
    if groups.len() >= 2 { groups } else { vec![text] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(extraction: &AnswerExtraction) -> Vec<(&str, bool)> {
        extraction
            .answers
            .iter()
            .map(|a| (a.content.as_str(), a.is_correct))
            .collect()
    }

    #[test]
    fn test_basic_list() {
        let ex = extract_answers("\n{2}\n{\\True{3}}\n");
        assert_eq!(contents(&ex), vec![("2", false), ("3", true)]);
        assert_eq!(ex.answers[0].id, "answer-0");
        assert_eq!(ex.answers[1].id, "answer-1");
        assert!(ex.diagnostics.is_empty());
    }

    #[test]
    fn test_marker_inside_group() {
        let ex = extract_answers("{\\True $\\dfrac{1}{2}$}\n{$1$}");
        assert_eq!(contents(&ex), vec![("$\\dfrac{1}{2}$", true), ("$1$", false)]);
    }

    #[test]
    fn test_marker_name_boundary() {
        let ex = extract_answers("{\\Truest}");
        assert_eq!(contents(&ex), vec![("\\Truest", false)]);
    }

    #[test]
    fn test_one_line_list() {
        let ex = extract_answers("{A}{\\True B} {C}{D}");
        assert_eq!(
            contents(&ex),
            vec![("A", false), ("B", true), ("C", false), ("D", false)]
        );
    }

    #[test]
    fn test_unwrap_braces() {
        assert_eq!(unwrap_braces("{a}"), "a");
        assert_eq!(unwrap_braces("{a}{b}"), "{a}{b}");
        assert_eq!(unwrap_braces("{\\{x\\}}"), "\\{x\\}");
        assert_eq!(unwrap_braces("plain"), "plain");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let ex = extract_answers("% header\n\n{a} % first\n   \n{b}\n");
        assert_eq!(contents(&ex), vec![("a", false), ("b", false)]);
    }

    #[test]
    fn test_multi_line_answer_is_joined() {
        let ex = extract_answers("{$\\begin{cases} x=1 \\\\\ny=2 \\end{cases}$}\n{\\True none}");
        assert_eq!(ex.answers.len(), 2);
        assert_eq!(ex.answers[0].content, "$\\begin{cases} x=1 \\\\\ny=2 \\end{cases}$");
        assert!(ex.answers[1].is_correct);
        assert!(ex.diagnostics.is_empty());
    }

    #[test]
    fn test_split_fraction_repair() {
        let ex = extract_answers("{$\\dfrac{2}{3}$}\n{\\dfrac{5\n7}$}");
        assert_eq!(ex.answers.len(), 2);
        assert_eq!(ex.answers[0].content, "$\\dfrac{2}{3}$");
        assert_eq!(ex.answers[1].content, "\\dfrac{5}{7}$");
        assert_eq!(ex.diagnostics.len(), 1);
        assert_eq!(ex.diagnostics[0].kind, DiagnosticKind::MalformedAnswer);
        assert_eq!(ex.diagnostics[0].severity, Severity::Information);
        assert_eq!(ex.diagnostics[0].position, Some(17));
    }

    #[test]
    fn test_split_fraction_repair_disabled() {
        let ex = AnswerExtractor::new("\\True")
            .repair_split_fractions(false)
            .extract("{\\dfrac{5\n7}$}");
        assert_eq!(ex.answers.len(), 1);
        assert_eq!(ex.answers[0].content, "\\dfrac{5\n7}$");
        assert!(ex.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_entry_reported() {
        let ex = extract_answers("{}\n{x}");
        assert_eq!(ex.answers.len(), 2);
        assert_eq!(ex.diagnostics.len(), 1);
        assert_eq!(ex.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_custom_marker() {
        let ex = AnswerExtractor::new("\\dung").extract("{\\dung A}\n{B}");
        assert_eq!(contents(&ex), vec![("A", true), ("B", false)]);
    }

    #[test]
    fn test_round_trip_k_entries() {
        let items = ["$x$", "\\dfrac{a}{b}", "{nested}", "plain text"];
        for correct in 0..items.len() {
            let body: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(i, s)| if i == correct { format!("{{\\True {s}}}") } else { format!("{{{s}}}") })
                .collect();
            let ex = extract_answers(&body.join("\n"));
            assert_eq!(ex.answers.len(), items.len());
            let flagged: Vec<_> = ex.answers.iter().filter(|a| a.is_correct).collect();
            assert_eq!(flagged.len(), 1);
            assert_eq!(flagged[0].id, format!("answer-{correct}"));
        }
    }
}
