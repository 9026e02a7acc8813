use crate::identifier::{Identifier, Subcount};
use serde::{Deserialize, Serialize, Serializer};
use texbank_syntax::ParseDiagnostic;

/// One answer option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// `answer-0`, `answer-1`, ... in extraction order.
    pub id: String,
    pub content: String,
    pub is_correct: bool,
}

impl Answer {
    pub fn new(index: usize, content: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: format!("answer-{index}"),
            content: content.into(),
            is_correct,
        }
    }
}

/// The type-specific part of a [`Question`].
///
/// Serialized with an internal `type` tag, flattened into the question:
/// `{"content": "...", "type": "MultipleChoice", "answers": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionKind {
    MultipleChoice { answers: Vec<Answer> },
    TrueFalse { answers: Vec<Answer> },
    /// Literal accepted responses, in source order.
    ShortAnswer { accepted: Vec<String> },
    Essay,
}

/// Field-less view of [`QuestionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QuestionType::MultipleChoice => "multiple choice",
            QuestionType::TrueFalse => "true/false",
            QuestionType::ShortAnswer => "short answer",
            QuestionType::Essay => "essay",
        };
        f.write_str(name)
    }
}

/// A single extracted question.
///
/// The JSON form also carries `correct_answer_ids`, computed from the kind
/// when serializing and ignored when reading back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub content: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcount: Option<Subcount>,
    /// Free-text provenance taken from a `%[...]` comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_note: Option<String>,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionKind::Essay => QuestionType::Essay,
        }
    }

    /// Answer options; empty for short-answer and essay questions.
    pub fn answers(&self) -> &[Answer] {
        match &self.kind {
            QuestionKind::MultipleChoice { answers } | QuestionKind::TrueFalse { answers } => answers,
            QuestionKind::ShortAnswer { .. } | QuestionKind::Essay => &[],
        }
    }

    /// Ids of the correct answers, or the accepted texts of a short-answer question.
    pub fn correct_answer_ids(&self) -> Vec<String> {
        match &self.kind {
            QuestionKind::ShortAnswer { accepted } => accepted.clone(),
            _ => self
                .answers()
                .iter()
                .filter(|a| a.is_correct)
                .map(|a| a.id.clone())
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct QuestionJson<'a> {
    content: &'a str,
    #[serde(flatten)]
    kind: &'a QuestionKind,
    correct_answer_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    question_id: Option<&'a Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subcount: Option<&'a Subcount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_note: Option<&'a str>,
}

impl Serialize for Question {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        QuestionJson {
            content: &self.content,
            kind: &self.kind,
            correct_answer_ids: self.correct_answer_ids(),
            solution: self.solution.as_deref(),
            question_id: self.question_id.as_ref(),
            subcount: self.subcount.as_ref(),
            source_note: self.source_note.as_deref(),
        }
        .serialize(serializer)
    }
}

/// A question together with the problems found while extracting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    pub question: Question,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ParseDiagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseStatus {
    Assembled,
    Failed,
}

/// Result of parsing one document.
///
/// A `Failed` output carries exactly one structural diagnostic and no
/// questions. An `Assembled` output carries one entry per question
/// environment in document order, and document-level notes (such as "no
/// question environment found") in `diagnostics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutput {
    pub schema_version: String,
    pub status: ParseStatus,
    pub questions: Vec<ParsedQuestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParseOutput {
    pub(crate) fn failed(diagnostic: ParseDiagnostic) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            status: ParseStatus::Failed,
            questions: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ParseStatus::Failed
    }

    pub fn iter_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().map(|p| &p.question)
    }

    /// Every diagnostic, document-level first, then per question in order.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.diagnostics
            .iter()
            .chain(self.questions.iter().flat_map(|p| p.diagnostics.iter()))
    }
}
