//! Low-level scanning for exam-style LaTeX question banks.
//!
//! This crate knows nothing about questions. It pairs delimiters, finds
//! command arguments and environment bodies, and checks that a document is
//! structurally sound. `texbank-question` builds the question model on top.

pub mod command;
pub mod diagnostic;
pub mod environment;
pub mod lexer;
pub mod scanner;
pub mod validate;

pub use command::{CommandInvocation, extract_command_args};
pub use diagnostic::{DiagnosticKind, ParseDiagnostic, Severity};
pub use environment::{EnvironmentSpan, extract_environments};
pub use scanner::match_delimiter;
pub use validate::{DocumentValidator, validate_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyntaxKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Command, // \choice, \{, \\
    Dollar,  // $ or $$
    Whitespace,
    Comment, // % ...
    Text,

    Eof,
}
