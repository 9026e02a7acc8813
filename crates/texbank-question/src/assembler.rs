use std::ops::Range;

use texbank_syntax::command::{extract_command_args, read_optional_groups};
use texbank_syntax::environment::environment_spans;
use texbank_syntax::scanner::{command_positions, group_depth, strip_comments};
use texbank_syntax::{DiagnosticKind, ParseDiagnostic, validate_document};

use crate::answer::AnswerExtractor;
use crate::identifier::scan_identifiers;
use crate::model::{Answer, ParseOutput, ParseStatus, ParsedQuestion, Question, QuestionKind};
use crate::options::ParseOptions;
use crate::solution::solution_invocation;

/// Stages of one document parse. `Assembled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Start,
    Validated,
    EnvironmentsFound,
    PerQuestionExtraction,
    Assembled,
    Failed,
}

/// Turns a LaTeX document into questions.
///
/// ## Pipeline
///
/// 1. **Validate**: the whole document goes through
///    [`validate_document`]. The first unbalanced brace or bracket ends the
///    parse with [`ParseStatus::Failed`] and no questions.
/// 2. **Find environments**: every top-level question environment (`ex` by
///    default) becomes one question. A document with no such environment at
///    all is read as one question made of the whole text.
/// 3. **Extract**: for each environment, identifiers, type, answers and
///    solution are read independently. Problems are attached to that
///    question and never stop its siblings. Type commands only count at the
///    top level of the question, so a `\choiceTF` quoted inside the
///    solution does not change the type.
///
/// The parser keeps no state between calls; the same input always produces
/// the same output.
#[derive(Debug, Clone, Default)]
pub struct QuestionParser {
    options: ParseOptions,
}

/// The command that decided a question's type, and where it is.
struct TypeMarker<'a> {
    command: &'a str,
    position: usize,
    /// `\choice`/`\choiceTF` rather than the short-answer command.
    is_choice: bool,
}

impl QuestionParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self, source: &str) -> ParseOutput {
        let mut state = ParseState::Start;

        let gate = validate_document(source);
        if let Some(fatal) = gate.iter().find(|d| d.is_fatal()) {
            advance(&mut state, ParseState::Failed);
            log::debug!("document rejected: {fatal}");
            return ParseOutput::failed(fatal.clone());
        }
        let mut document = gate;
        advance(&mut state, ParseState::Validated);

        let env = self.options.environment.as_str();
        let mut spans = Vec::new();
        let mut unterminated = false;
        for span in environment_spans(source, env) {
            match span {
                Ok(span) => spans.push(span),
                Err(err) => {
                    unterminated = true;
                    if !document.iter().any(|d| d.position == err.position) {
                        document.push(err);
                    }
                }
            }
        }
        advance(&mut state, ParseState::EnvironmentsFound);
        log::debug!("found {} `{env}` environment(s)", spans.len());

        advance(&mut state, ParseState::PerQuestionExtraction);
        let questions = if !spans.is_empty() {
            spans
                .iter()
                .map(|span| self.extract_question(span.content(source), span.content_start))
                .collect()
        } else {
            if !unterminated {
                document.push(ParseDiagnostic::new(
                    DiagnosticKind::MissingEnvironment,
                    format!("no `\\begin{{{env}}}` found; reading the whole input as one question"),
                ));
            }
            if unterminated || strip_comments(source).trim().is_empty() {
                Vec::new()
            } else {
                vec![self.extract_question(source, 0)]
            }
        };

        advance(&mut state, ParseState::Assembled);
        ParseOutput {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            status: ParseStatus::Assembled,
            questions,
            diagnostics: document,
        }
    }

    /// Builds one question from the text of a single environment. `base` is
    /// the document offset of `text`, used to rebase diagnostic positions.
    fn extract_question(&self, text: &str, base: usize) -> ParsedQuestion {
        let opts = &self.options;
        let mut diagnostics = Vec::new();

        let ids = scan_identifiers(text);
        diagnostics.extend(ids.diagnostics);

        let (solution, solution_span) = match solution_invocation(text, &opts.solution_command) {
            None => (None, None),
            Some(Ok(invocation)) => (
                Some(invocation.mandatory.to_string()),
                Some(invocation.position..invocation.end),
            ),
            Some(Err(err)) => {
                // The command is still there; only its argument is unreadable.
                diagnostics.push(err);
                let at = command_positions(text, &opts.solution_command)
                    .next()
                    .unwrap_or(text.len());
                (None, Some(at..at))
            }
        };
        let solution_pos = solution_span.as_ref().map(|span| span.start);

        let (kind, content_end) = match self.detect_type(text, solution_span.as_ref()) {
            Some(marker) if marker.is_choice => {
                let answers = self.extract_choice_body(text, &marker, solution_pos, &mut diagnostics);
                let kind = if marker.command == opts.true_false_command {
                    QuestionKind::TrueFalse { answers }
                } else {
                    QuestionKind::MultipleChoice { answers }
                };
                (kind, marker.position)
            }
            Some(marker) => {
                let mut accepted = Vec::new();
                for arg in extract_command_args(text, marker.command) {
                    match arg {
                        Ok(invocation) => {
                            if is_type_position(text, invocation.position, solution_span.as_ref()) {
                                accepted.push(invocation.mandatory.to_string());
                            }
                        }
                        Err(err) => diagnostics.push(err),
                    }
                }
                (QuestionKind::ShortAnswer { accepted }, marker.position)
            }
            None => (QuestionKind::Essay, solution_pos.unwrap_or(text.len())),
        };

        let mut excluded = ids.inline_tokens;
        excluded.extend(solution_span);
        let question = Question {
            content: strip_comments(&without_spans(&text[..content_end], &excluded))
                .trim()
                .to_string(),
            kind,
            solution,
            question_id: ids.question_id,
            subcount: ids.subcount,
            source_note: ids.source_note,
        };
        log::trace!("extracted {} question", question.question_type());

        ParsedQuestion {
            question,
            diagnostics: diagnostics
                .into_iter()
                .map(|d| demote_structural(d).offset_by(base))
                .collect(),
        }
    }

    /// `\choiceTF` beats `\choice`, which beats the short-answer command.
    /// Only top-level invocations outside the solution are considered.
    fn detect_type(&self, text: &str, solution: Option<&Range<usize>>) -> Option<TypeMarker<'_>> {
        let opts = &self.options;
        let ordered = [
            (opts.true_false_command.as_str(), true),
            (opts.choice_command.as_str(), true),
            (opts.short_answer_command.as_str(), false),
        ];
        ordered.into_iter().find_map(|(command, is_choice)| {
            command_positions(text, command)
                .find(|&position| is_type_position(text, position, solution))
                .map(|position| TypeMarker {
                    command,
                    position,
                    is_choice,
                })
        })
    }

    /// Answers between the choice command (after its optional groups) and
    /// the solution command or the end of the question.
    fn extract_choice_body(
        &self,
        text: &str,
        marker: &TypeMarker<'_>,
        solution_pos: Option<usize>,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Vec<Answer> {
        let after_command = marker.position + marker.command.len();
        let body_start = match read_optional_groups(text, after_command) {
            Ok((_, cursor)) => cursor,
            Err(err) => {
                diagnostics.push(err);
                after_command
            }
        };
        let body_end = solution_pos.filter(|&p| p >= body_start).unwrap_or(text.len());

        let extraction = AnswerExtractor::new(&self.options.correct_marker)
            .repair_split_fractions(self.options.repair_split_fractions)
            .extract(&text[body_start..body_end]);
        diagnostics.extend(extraction.diagnostics.into_iter().map(|d| d.offset_by(body_start)));

        if extraction.answers.is_empty() {
            diagnostics.push(
                ParseDiagnostic::new(
                    DiagnosticKind::MalformedAnswer,
                    format!("`{}` is not followed by any answer", marker.command),
                )
                .at(marker.position),
            );
        }
        extraction.answers
    }
}

fn is_type_position(text: &str, position: usize, solution: Option<&Range<usize>>) -> bool {
    group_depth(text, position) == 0 && !solution.is_some_and(|span| span.contains(&position))
}

/// Copies `text`, leaving out every byte range in `spans`. Ranges may overlap
/// or reach past the end of `text`.
fn without_spans(text: &str, spans: &[Range<usize>]) -> String {
    let mut spans: Vec<_> = spans
        .iter()
        .filter(|span| span.start < text.len())
        .map(|span| span.start..span.end.min(text.len()))
        .collect();
    spans.sort_by_key(|span| span.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            out.push_str(&text[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
    }
    out.push_str(&text[cursor.min(text.len())..]);
    out
}

/// Only the document gate may fail a parse. A delimiter problem met while
/// reading one question's arguments (a `[` that a stray `$` hid from the
/// gate, say) stays with that question as a warning.
fn demote_structural(diagnostic: ParseDiagnostic) -> ParseDiagnostic {
    if !diagnostic.is_fatal() {
        return diagnostic;
    }
    let kind = DiagnosticKind::MalformedIdentifier;
    ParseDiagnostic {
        kind,
        severity: kind.default_severity(),
        ..diagnostic
    }
}

fn advance(state: &mut ParseState, next: ParseState) {
    log::debug!("parse state {state:?} -> {next:?}");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionType;
    use texbank_syntax::Severity;

    fn parse(src: &str) -> ParseOutput {
        QuestionParser::default().parse(src)
    }

    #[test]
    fn test_type_precedence() {
        let out = parse("\\begin{ex}Đúng hay sai?\\choiceTF\n{\\True a}\n{b}\n\\end{ex}");
        let q = &out.questions[0].question;
        assert_eq!(q.question_type(), QuestionType::TrueFalse);
        assert_eq!(q.content, "Đúng hay sai?");
        assert_eq!(q.correct_answer_ids(), vec!["answer-0".to_string()]);
    }

    #[test]
    fn test_choice_optional_group_skipped() {
        let out = parse("\\begin{ex}Q\\choice[2]{A}{\\True B}\\end{ex}");
        let q = &out.questions[0].question;
        assert_eq!(q.question_type(), QuestionType::MultipleChoice);
        assert_eq!(q.answers().len(), 2);
        assert!(q.answers()[1].is_correct);
    }

    #[test]
    fn test_short_answer() {
        let out = parse("\\begin{ex}Tính $x$.\n\\shortans[oly]{$0{,}5$}\n\\loigiai{Dễ.}\\end{ex}");
        let q = &out.questions[0].question;
        assert_eq!(q.question_type(), QuestionType::ShortAnswer);
        assert_eq!(q.content, "Tính $x$.");
        assert_eq!(q.correct_answer_ids(), vec!["$0{,}5$".to_string()]);
        assert_eq!(q.solution.as_deref(), Some("Dễ."));
    }

    #[test]
    fn test_empty_choice_reported() {
        let out = parse("\\begin{ex}Q\n\\choice\n\\loigiai{x}\n\\end{ex}");
        let pq = &out.questions[0];
        assert!(pq.question.answers().is_empty());
        assert_eq!(pq.diagnostics.len(), 1);
        assert_eq!(pq.diagnostics[0].kind, DiagnosticKind::MalformedAnswer);
        // `\choice` sits at byte 2 of the environment body, which starts at 10
        assert_eq!(pq.diagnostics[0].position, Some(12));
    }

    #[test]
    fn test_unterminated_environment_yields_nothing() {
        let out = parse("\\begin{ex} Q without end");
        assert_eq!(out.status, ParseStatus::Assembled);
        assert!(out.questions.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::MissingEnvironment);
    }

    #[test]
    fn test_whitespace_only_input() {
        let out = parse("  \n\t");
        assert_eq!(out.status, ParseStatus::Assembled);
        assert!(out.questions.is_empty());
    }

    #[test]
    fn test_type_command_quoted_in_solution_ignored() {
        let src = "\\begin{ex}Chọn đáp án đúng.\\choice\n{\\True a}\n{b}\n\\loigiai{Câu này không phải dạng \\choiceTF.}\n\\end{ex}";
        let pq = &parse(src).questions[0];
        let q = &pq.question;
        assert!(pq.diagnostics.is_empty());
        assert_eq!(q.question_type(), QuestionType::MultipleChoice);
        assert_eq!(q.content, "Chọn đáp án đúng.");
        let answers: Vec<_> = q.answers().iter().map(|a| (a.content.as_str(), a.is_correct)).collect();
        assert_eq!(answers, vec![("a", true), ("b", false)]);
        assert_eq!(q.solution.as_deref(), Some("Câu này không phải dạng \\choiceTF."));
    }

    #[test]
    fn test_short_answer_inside_solution_not_accepted() {
        let src = "\\begin{ex}Tính.\\shortans{2}\\loigiai{Không ghi \\shortans{3}.}\\end{ex}";
        let q = &parse(src).questions[0].question;
        assert_eq!(q.question_type(), QuestionType::ShortAnswer);
        assert_eq!(q.correct_answer_ids(), vec!["2".to_string()]);
    }

    #[test]
    fn test_solution_before_choice_left_out_of_content() {
        let out = parse("\\begin{ex}Q\\loigiai{S}\\choice{a}{\\True b}\\end{ex}");
        let q = &out.questions[0].question;
        assert_eq!(q.content, "Q");
        assert_eq!(q.solution.as_deref(), Some("S"));
        assert_eq!(q.correct_answer_ids(), vec!["answer-1".to_string()]);
    }

    #[test]
    fn test_hidden_bracket_stays_with_question() {
        // The stray `$` keeps the gate in math mode, so the `[` is only
        // noticed while reading the `\shortans` arguments.
        let out = parse("\\begin{ex}Giá 5$ \\shortans[oly{1}\\end{ex}");
        assert_eq!(out.status, ParseStatus::Assembled);
        assert!(!out.all_diagnostics().any(ParseDiagnostic::is_fatal));

        let pq = &out.questions[0];
        assert_eq!(pq.question.question_type(), QuestionType::ShortAnswer);
        assert_eq!(pq.question.content, "Giá 5$");
        assert_eq!(pq.diagnostics.len(), 1);
        assert_eq!(pq.diagnostics[0].kind, DiagnosticKind::MalformedIdentifier);
        assert_eq!(pq.diagnostics[0].severity, Severity::Warning);
        assert_eq!(pq.diagnostics[0].position, Some(27));
    }

    #[test]
    fn test_messages_do_not_carry_local_offsets() {
        let src = "\\begin{ex}Q\\end{ex}\\begin{ex}Tính.\\shortans 42\\end{ex}";
        let d = &parse(src).questions[1].diagnostics[0];
        assert_eq!(d.position, src.find("\\shortans"));
        assert_eq!(d.message, "`\\shortans` is not followed by a `{...}` argument");
    }

    #[test]
    fn test_comment_only_input() {
        let out = parse("% chỉ có chú thích\n%[0D1Y1-1]\n");
        assert_eq!(out.status, ParseStatus::Assembled);
        assert!(out.questions.is_empty());
    }

    #[test]
    fn test_inline_identifier_left_out_of_content() {
        let out = parse("\\begin{ex}[0D1Y1-1] Bao nhiêu?\\end{ex}");
        let q = &out.questions[0].question;
        assert_eq!(q.question_id.as_ref().map(|id| id.raw.as_str()), Some("0D1Y1-1"));
        assert_eq!(q.content, "Bao nhiêu?");
    }

    #[test]
    fn test_without_spans() {
        assert_eq!(without_spans("abcdef", &[4..9, 1..2, 1..3]), "ad");
        assert_eq!(without_spans("abc", &[5..6]), "abc");
    }

    #[test]
    fn test_custom_environment_name() {
        let parser = QuestionParser::new(ParseOptions {
            environment: "bt".to_string(),
            ..ParseOptions::default()
        });
        let out = parser.parse("\\begin{bt}A\\end{bt}\\begin{bt}B\\end{bt}");
        let contents: Vec<_> = out.iter_questions().map(|q| q.content.as_str()).collect();
        assert_eq!(contents, vec!["A", "B"]);
    }
}
