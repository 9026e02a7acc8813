//! Named environment extraction.
//!
//! Locates `\begin{name} ... \end{name}` spans and hands back their inner
//! text verbatim. Only environments with the requested name move the nesting
//! counter; everything else (`itemize`, `tabular`, ...) is opaque content.
//! A same-name environment nested inside another is swallowed by the outer
//! span rather than reported separately:
//!
//! ```
//! use texbank_syntax::environment::extract_environments;
//!
//! let src = r"\begin{ex}A\begin{ex}B\end{ex}C\end{ex}";
//! assert_eq!(extract_environments(src, "ex"), vec![r"A\begin{ex}B\end{ex}C"]);
//! ```

use crate::diagnostic::{DiagnosticKind, ParseDiagnostic};
use crate::scanner::is_in_comment;

/// Byte offsets of one top-level environment occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentSpan {
    /// Offset of the `\begin` backslash.
    pub start: usize,
    /// First byte after `\begin{name}`.
    pub content_start: usize,
    /// Offset of the matching `\end` backslash.
    pub content_end: usize,
    /// First byte after `\end{name}`.
    pub end: usize,
}

impl EnvironmentSpan {
    pub fn content<'a>(&self, source: &'a str) -> &'a str {
        &source[self.content_start..self.content_end]
    }
}

/// Iterator over the top-level spans of one environment name.
///
/// An unterminated `\begin{name}` yields a single
/// [`DiagnosticKind::MissingEnvironment`] error and ends the iteration, since
/// everything after it would belong to that span.
pub struct EnvironmentSpans<'a> {
    source: &'a str,
    begin: String,
    end: String,
    cursor: usize,
    done: bool,
}

pub fn environment_spans<'a>(source: &'a str, name: &str) -> EnvironmentSpans<'a> {
    EnvironmentSpans {
        source,
        begin: format!("\\begin{{{name}}}"),
        end: format!("\\end{{{name}}}"),
        cursor: 0,
        done: false,
    }
}

/// Inner content of every top-level `name` environment, in document order.
/// Unterminated environments are left out.
pub fn extract_environments<'a>(source: &'a str, name: &str) -> Vec<&'a str> {
    environment_spans(source, name)
        .filter_map(Result::ok)
        .map(|span| span.content(source))
        .collect()
}

impl<'a> EnvironmentSpans<'a> {
    /// Next live (uncommented) occurrence of `marker` at or after `from`.
    fn find_marker(&self, marker: &str, from: usize) -> Option<usize> {
        let mut from = from;
        loop {
            let pos = from + self.source.get(from..)?.find(marker)?;
            if !is_in_comment(self.source, pos) {
                return Some(pos);
            }
            from = pos + marker.len();
        }
    }
}

impl Iterator for EnvironmentSpans<'_> {
    type Item = Result<EnvironmentSpan, ParseDiagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.find_marker(&self.begin, self.cursor)?;
        let content_start = start + self.begin.len();

        let mut depth = 1usize;
        let mut cursor = content_start;
        loop {
            let next_begin = self.find_marker(&self.begin, cursor);
            let Some(next_end) = self.find_marker(&self.end, cursor) else {
                self.done = true;
                log::debug!("unterminated `{}` at byte {start}", self.begin);
                return Some(Err(ParseDiagnostic::new(
                    DiagnosticKind::MissingEnvironment,
                    format!("`{}` has no matching `{}`", self.begin, self.end),
                )
                .at(start)));
            };

            match next_begin {
                Some(b) if b < next_end => {
                    depth += 1;
                    cursor = b + self.begin.len();
                }
                _ => {
                    depth -= 1;
                    cursor = next_end + self.end.len();
                    if depth == 0 {
                        self.cursor = cursor;
                        return Some(Ok(EnvironmentSpan {
                            start,
                            content_start,
                            content_end: next_end,
                            end: cursor,
                        }));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_environment() {
        let src = "intro\n\\begin{ex}\nQ1\n\\end{ex}\noutro";
        assert_eq!(extract_environments(src, "ex"), vec!["\nQ1\n"]);
    }

    #[test]
    fn test_multiple_environments_in_order() {
        let src = r"\begin{ex}one\end{ex} text \begin{ex}two\end{ex}";
        assert_eq!(extract_environments(src, "ex"), vec!["one", "two"]);
    }

    #[test]
    fn test_other_environments_are_opaque() {
        let src = r"\begin{ex}\begin{itemize}\item a\end{itemize}\end{ex}";
        assert_eq!(
            extract_environments(src, "ex"),
            vec![r"\begin{itemize}\item a\end{itemize}"]
        );
    }

    #[test]
    fn test_same_name_nesting_swallowed() {
        let src = r"\begin{ex}A\begin{ex}B\end{ex}C\end{ex}";
        let spans: Vec<_> = environment_spans(src, "ex").collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].as_ref().unwrap().content(src), r"A\begin{ex}B\end{ex}C");
    }

    #[test]
    fn test_span_offsets() {
        let src = r"xx\begin{ex}Q\end{ex}yy";
        let span = environment_spans(src, "ex").next().unwrap().unwrap();
        assert_eq!(span.start, 2);
        assert_eq!(span.content_start, 12);
        assert_eq!(span.content_end, 13);
        assert_eq!(&src[span.end..], "yy");
    }

    #[test]
    fn test_unterminated_reports_missing_environment() {
        let src = r"\begin{ex}done\end{ex} \begin{ex}open";
        let spans: Vec<_> = environment_spans(src, "ex").collect();
        assert_eq!(spans.len(), 2);
        assert!(spans[0].is_ok());
        let err = spans[1].as_ref().unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MissingEnvironment);
        assert_eq!(err.position, Some(23));
        assert_eq!(extract_environments(src, "ex"), vec!["done"]);
    }

    #[test]
    fn test_commented_markers_ignored() {
        let src = "\\begin{ex}A\n% \\end{ex}\nB\\end{ex}";
        assert_eq!(extract_environments(src, "ex"), vec!["A\n% \\end{ex}\nB"]);
    }

    #[test]
    fn test_name_prefix_does_not_match() {
        let src = r"\begin{exercise}x\end{exercise}";
        assert!(extract_environments(src, "ex").is_empty());
    }

    #[test]
    fn test_no_environment() {
        assert!(extract_environments("What is 2+2?", "ex").is_empty());
    }
}
