//! Question identifiers written as bracketed comment tokens.
//!
//! Two conventions share the same `%[...]` syntax:
//!
//! - a **QuestionID** such as `[0D1Y1-1]`: grade digit, subject letter,
//!   chapter digit, level letter, then an optional lesson code and an
//!   optional `-form` suffix;
//! - a **Subcount** such as `[TL.242428]`: a letter prefix, a dot and a
//!   number.
//!
//! The dot is what tells them apart. Codes are returned raw; mapping `0` to
//! a grade or `D` to a subject name is left to the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use texbank_syntax::{DiagnosticKind, ParseDiagnostic};

static BRACKET_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(%?)[ \t]*\[([^\[\]\r\n]*)\]").expect("bracket token pattern compiles")
});

static QUESTION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9])([A-Z])([0-9])([A-Z])([0-9A-Z])?(?:-([0-9A-Z]))?$")
        .expect("question id pattern compiles")
});

static SUBCOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)\.([0-9]+)$").expect("subcount pattern compiles"));

/// A QuestionID split into its positional codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// The token as written, without brackets.
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
}

impl Identifier {
    /// Parses a bare token such as `0D1Y1-1`.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = QUESTION_ID.captures(token)?;
        let code = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        Some(Self {
            raw: token.to_string(),
            grade: code(1),
            subject: code(2),
            chapter: code(3),
            level: code(4),
            lesson: code(5),
            form: code(6),
        })
    }

    /// Present codes paired with their field names, in positional order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("grade", &self.grade),
            ("subject", &self.subject),
            ("chapter", &self.chapter),
            ("level", &self.level),
            ("lesson", &self.lesson),
            ("form", &self.form),
        ]
        .into_iter()
        .filter_map(|(name, code)| code.as_deref().map(|c| (name, c)))
    }
}

/// A `PREFIX.NUMBER` reference code.
///
/// `full_id` is derived from the other two fields and recomputed whenever
/// one of them changes, so the three can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubcountParts")]
pub struct Subcount {
    prefix: String,
    number: String,
    full_id: String,
}

#[derive(Deserialize)]
struct SubcountParts {
    prefix: String,
    number: String,
}

impl From<SubcountParts> for Subcount {
    fn from(parts: SubcountParts) -> Self {
        Subcount::new(parts.prefix, parts.number)
    }
}

impl Subcount {
    pub fn new(prefix: impl Into<String>, number: impl Into<String>) -> Self {
        let mut subcount = Self {
            prefix: prefix.into(),
            number: number.into(),
            full_id: String::new(),
        };
        subcount.refresh();
        subcount
    }

    /// Parses a bare token such as `TL.242428`.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = SUBCOUNT.captures(token)?;
        Some(Self::new(&caps[1], &caps[2]))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn full_id(&self) -> &str {
        &self.full_id
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
        self.refresh();
    }

    pub fn set_number(&mut self, number: impl Into<String>) {
        self.number = number.into();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.full_id = format!("{}.{}", self.prefix, self.number);
    }
}

impl std::fmt::Display for Subcount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_id)
    }
}

/// Everything the bracketed tokens of one question yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierScan {
    pub question_id: Option<Identifier>,
    pub subcount: Option<Subcount>,
    pub source_note: Option<String>,
    pub diagnostics: Vec<ParseDiagnostic>,
    /// Byte ranges, brackets included, of identifier tokens written outside
    /// comments. They are metadata and do not belong to the question text.
    pub inline_tokens: Vec<Range<usize>>,
}

/// Scans `text` for bracketed identifier tokens.
///
/// The first QuestionID and the first Subcount win. A `%[...]` comment token
/// that is neither becomes the source note, unless it looks like a broken
/// identifier (starts with a digit and an uppercase letter, or is a dotted
/// word that is not `PREFIX.NUMBER`), which is reported as
/// [`DiagnosticKind::MalformedIdentifier`] instead. Bracketed text outside
/// comments is only inspected for well-formed identifiers, since it is
/// usually an optional command argument.
pub fn scan_identifiers(text: &str) -> IdentifierScan {
    let mut scan = IdentifierScan::default();

    for caps in BRACKET_TOKEN.captures_iter(text) {
        let in_comment = !caps[1].is_empty();
        let token = caps[2].trim();
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let bracketed = inner.start() - 1..inner.end() + 1;

        if token.contains('.') {
            if let Some(subcount) = Subcount::parse(token) {
                if scan.subcount.is_none() {
                    scan.subcount = Some(subcount);
                }
                if !in_comment {
                    scan.inline_tokens.push(bracketed);
                }
                continue;
            }
        } else if let Some(id) = Identifier::parse(token) {
            if scan.question_id.is_none() {
                scan.question_id = Some(id);
            }
            if !in_comment {
                scan.inline_tokens.push(bracketed);
            }
            continue;
        }

        if !in_comment {
            continue;
        }
        if looks_like_identifier(token) {
            log::warn!("malformed identifier token `[{token}]` at byte {}", whole.start());
            scan.diagnostics.push(
                ParseDiagnostic::new(
                    DiagnosticKind::MalformedIdentifier,
                    format!("`[{token}]` is neither a question id nor a subcount"),
                )
                .at(whole.start()),
            );
        } else if scan.source_note.is_none() && !token.is_empty() {
            scan.source_note = Some(token.to_string());
        }
    }
    scan
}

/// First QuestionID token in `text`, if any.
pub fn extract_identifier(text: &str) -> Option<Identifier> {
    scan_identifiers(text).question_id
}

/// First Subcount token in `text`, if any.
pub fn extract_subcount(text: &str) -> Option<Subcount> {
    scan_identifiers(text).subcount
}

fn looks_like_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    let id_like = matches!(
        (chars.next(), chars.next()),
        (Some(d), Some(u)) if d.is_ascii_digit() && u.is_ascii_uppercase()
    );
    let dotted_word = token.contains('.') && !token.chars().any(char::is_whitespace);
    id_like || dotted_word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_question_id() {
        let id = extract_identifier("%[0D1Y1-1]\nText").unwrap();
        assert_eq!(id.raw, "0D1Y1-1");
        assert_eq!(id.grade.as_deref(), Some("0"));
        assert_eq!(id.subject.as_deref(), Some("D"));
        assert_eq!(id.chapter.as_deref(), Some("1"));
        assert_eq!(id.level.as_deref(), Some("Y"));
        assert_eq!(id.lesson.as_deref(), Some("1"));
        assert_eq!(id.form.as_deref(), Some("1"));
    }

    #[test]
    fn test_short_question_id() {
        let id = extract_identifier("%[2H3B]").unwrap();
        let fields: Vec<_> = id.fields().collect();
        assert_eq!(
            fields,
            vec![("grade", "2"), ("subject", "H"), ("chapter", "3"), ("level", "B")]
        );
    }

    #[test]
    fn test_subcount() {
        let sc = extract_subcount("% [TL.242428]").unwrap();
        assert_eq!(sc.prefix(), "TL");
        assert_eq!(sc.number(), "242428");
        assert_eq!(sc.full_id(), "TL.242428");
    }

    #[test]
    fn test_both_and_source_note() {
        let scan = scan_identifiers("%[0D1Y1-1]%[TL.100]\n%[Đề thi thử Sở GD 2023]\nText");
        assert_eq!(scan.question_id.unwrap().raw, "0D1Y1-1");
        assert_eq!(scan.subcount.unwrap().full_id(), "TL.100");
        assert_eq!(scan.source_note.as_deref(), Some("Đề thi thử Sở GD 2023"));
        assert!(scan.diagnostics.is_empty());
    }

    #[test]
    fn test_absent() {
        let scan = scan_identifiers("What is 2+2? \\choice[2]{a}");
        assert!(scan.question_id.is_none());
        assert!(scan.subcount.is_none());
        assert!(scan.source_note.is_none());
        assert!(scan.diagnostics.is_empty());
    }

    #[test]
    fn test_inline_tokens_located() {
        let src = "[0D1Y1-1] Q? %[TL.1]\n\\choice[2]{a}";
        let scan = scan_identifiers(src);
        assert_eq!(scan.question_id.unwrap().raw, "0D1Y1-1");
        assert_eq!(scan.subcount.unwrap().full_id(), "TL.1");
        assert_eq!(scan.inline_tokens, vec![0..9]);
        assert_eq!(&src[scan.inline_tokens[0].clone()], "[0D1Y1-1]");
    }

    #[test]
    fn test_malformed_tokens() {
        let scan = scan_identifiers("%[0D1Y1-12]\n%[TL.24a]");
        assert!(scan.question_id.is_none());
        assert!(scan.subcount.is_none());
        assert!(scan.source_note.is_none());
        assert_eq!(scan.diagnostics.len(), 2);
        assert_eq!(scan.diagnostics[0].kind, DiagnosticKind::MalformedIdentifier);
        assert_eq!(scan.diagnostics[0].position, Some(0));
        assert_eq!(scan.diagnostics[1].position, Some(12));
    }

    #[test]
    fn test_subcount_setters_keep_full_id() {
        let mut sc = Subcount::new("TL", "1");
        sc.set_number("42");
        assert_eq!(sc.full_id(), "TL.42");
        sc.set_prefix("GK");
        assert_eq!(sc.to_string(), "GK.42");
    }

    #[test]
    fn test_subcount_deserialize_recomputes_full_id() {
        let sc: Subcount =
            serde_json::from_str(r#"{"prefix":"TL","number":"7","full_id":"stale"}"#).unwrap();
        assert_eq!(sc.full_id(), "TL.7");
        let json = serde_json::to_value(&sc).unwrap();
        assert_eq!(json["full_id"], "TL.7");
    }
}
