//! # Question extraction for LaTeX question banks
//!
//! Turns exam-style LaTeX (the `ex` environment convention with `\choice`,
//! `\choiceTF`, `\shortans`, `\True` and `\loigiai`) into typed
//! [`Question`] records.
//!
//! ## Overview
//!
//! ```text
//! source ──► validate ──► `ex` spans ──► per span:
//!                                         identifiers  (%[0D1Y1-1], %[TL.242428])
//!                                         type         (\choiceTF > \choice > \shortans > essay)
//!                                         answers      (\True marks the correct ones)
//!                                         solution     (\loigiai{...})
//! ```
//!
//! Structural damage (an unbalanced brace or bracket anywhere) rejects the
//! whole document. Everything else is reported per question as a
//! [`ParseDiagnostic`] next to the question it concerns, and extraction of
//! the other questions goes on.
//!
//! ## Examples
//!
//! ```
//! use texbank_question::{parse_questions, QuestionType};
//!
//! let src = "\\begin{ex}%[0D1Y1-1]\n$1+1=?$\n\\choice\n{2}\n{\\True{3}}\n\\loigiai{Trivial}\n\\end{ex}";
//! let output = parse_questions(src);
//!
//! let q = &output.questions[0].question;
//! assert_eq!(q.question_type(), QuestionType::MultipleChoice);
//! assert_eq!(q.correct_answer_ids(), vec!["answer-1".to_string()]);
//! assert_eq!(q.question_id.as_ref().unwrap().raw, "0D1Y1-1");
//! ```
//!
//! The output types implement `serde::Serialize`, so a whole
//! [`ParseOutput`] can be written as JSON:
//!
//! ```
//! let output = texbank_question::parse_questions("What is 2+2?");
//! let json = serde_json::to_string_pretty(&output)?;
//! assert!(json.contains("\"Essay\""));
//! # Ok::<(), serde_json::Error>(())
//! ```

pub mod answer;
pub mod assembler;
pub mod error;
pub mod identifier;
pub mod model;
pub mod options;
pub mod render;
pub mod solution;


pub use answer::{AnswerExtraction, AnswerExtractor, extract_answers};
pub use assembler::{ParseState, QuestionParser};
pub use error::{Error, Result};
pub use identifier::{Identifier, Subcount, extract_identifier, extract_subcount};
pub use model::{
    Answer, ParseOutput, ParseStatus, ParsedQuestion, Question, QuestionKind, QuestionType,
};
pub use options::ParseOptions;
pub use render::{FormulaRenderer, render_math_spans};
pub use solution::extract_solution;
pub use texbank_syntax::{DiagnosticKind, ParseDiagnostic, Severity};

/// Version of the JSON produced from [`ParseOutput`].
///
/// - MAJOR: fields removed or renamed
/// - MINOR: new optional fields or question types
/// - PATCH: extraction fixes with no schema change
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Parses `source` with the default conventions.
pub fn parse_questions(source: &str) -> ParseOutput {
    QuestionParser::default().parse(source)
}
