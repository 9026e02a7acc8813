use texbank_syntax::{CommandInvocation, ParseDiagnostic, extract_command_args};

/// Reads the argument of the first `command` invocation (usually `\loigiai`).
///
/// Returns `Ok(None)` when the command does not occur, and an error when it
/// occurs without a readable `{...}` argument. A missing solution is not a
/// problem in itself; callers decide what to do with the error.
pub fn extract_solution(source: &str, command: &str) -> Result<Option<String>, ParseDiagnostic> {
    solution_invocation(source, command)
        .transpose()
        .map(|found| found.map(|invocation| invocation.mandatory.to_string()))
}

/// The first `command` invocation with its span, for callers that also need
/// to know where the solution sits in `source`.
pub fn solution_invocation<'a>(
    source: &'a str,
    command: &'a str,
) -> Option<Result<CommandInvocation<'a>, ParseDiagnostic>> {
    extract_command_args(source, command).next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use texbank_syntax::DiagnosticKind;

    #[test]
    fn test_simple_solution() {
        let src = "Q\n\\loigiai{ Trivial }\n";
        assert_eq!(extract_solution(src, "\\loigiai"), Ok(Some("Trivial".to_string())));
    }

    #[test]
    fn test_nested_formula() {
        let src = "\\loigiai{\n$x=\\dfrac{-b\\pm\\sqrt{\\Delta}}{2a}$\n}";
        assert_eq!(
            extract_solution(src, "\\loigiai").unwrap().as_deref(),
            Some("$x=\\dfrac{-b\\pm\\sqrt{\\Delta}}{2a}$")
        );
    }

    #[test]
    fn test_absent() {
        assert_eq!(extract_solution("Essay text", "\\loigiai"), Ok(None));
    }

    #[test]
    fn test_without_argument() {
        let err = extract_solution("Q \\loigiai see book", "\\loigiai").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MalformedIdentifier);
        assert_eq!(err.position, Some(2));
    }

    #[test]
    fn test_invocation_span() {
        let src = "Q\\loigiai{S}\\choice{a}";
        let invocation = solution_invocation(src, "\\loigiai").unwrap().unwrap();
        assert_eq!(invocation.position, 1);
        assert_eq!(&src[invocation.end..], "\\choice{a}");
    }

    #[test]
    fn test_commented_out_solution_ignored() {
        let src = "% \\loigiai{draft}\nQ";
        assert_eq!(extract_solution(src, "\\loigiai"), Ok(None));
    }
}
