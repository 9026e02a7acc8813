use clap::{Parser, Subcommand};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use texbank_question::{ParseOptions, ParseOutput, QuestionParser, QuestionType, render_math_spans};
use texbank_syntax::{Severity, validate_document};

#[derive(Parser)]
#[command(name = "texbank")]
#[command(about = "Extract questions from LaTeX question banks", long_about = None)]
struct Cli {
    /// JSON file overriding the markup conventions
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and emit the questions as JSON
    Parse {
        /// Path to the .tex file, or `-` for stdin
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Run the structural checks only
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the questions with formulas wrapped in HTML
    Render {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => ParseOptions::load_from_path(path)?,
        None => ParseOptions::default(),
    };
    let parser = QuestionParser::new(options);

    match &cli.command {
        Commands::Parse { path } => {
            let content = read_source(path)?;
            let output = parser.parse(&content);
            println!("{}", serde_json::to_string_pretty(&output)?);
            report(path, &output)?;
        }
        Commands::Check { path } => {
            let content = read_source(path)?;
            let diagnostics = validate_document(&content);
            for d in &diagnostics {
                let (line, column) = d.position.map_or((1, 1), |p| line_column(&content, p));
                println!("{}:{line}:{column}: {}: {}", path.display(), d.severity, d.message);
            }
            let fatal = diagnostics.iter().filter(|d| d.is_fatal()).count();
            if fatal > 0 {
                anyhow::bail!("{fatal} structural problem(s) found");
            }
            log::info!("{}: {} diagnostic(s), none fatal", path.display(), diagnostics.len());
        }
        Commands::Render { path } => {
            let content = read_source(path)?;
            let output = parser.parse(&content);
            let math = |formula: &str, display: bool| {
                let class = if display { "math display" } else { "math" };
                format!("<span class=\"{class}\">{}</span>", escape_html(formula))
            };
            for (i, q) in output.iter_questions().enumerate() {
                println!("<section class=\"question\" data-type=\"{:?}\">", q.question_type());
                println!("<p>Câu {}: {}</p>", i + 1, render_math_spans(&q.content, &math));
                if q.question_type() != QuestionType::Essay && !q.answers().is_empty() {
                    println!("<ol type=\"A\">");
                    for a in q.answers() {
                        let mark = if a.is_correct { " class=\"correct\"" } else { "" };
                        println!("<li{mark}>{}</li>", render_math_spans(&a.content, &math));
                    }
                    println!("</ol>");
                }
                if let Some(solution) = &q.solution {
                    println!("<div class=\"solution\">{}</div>", render_math_spans(solution, &math));
                }
                println!("</section>");
            }
            report(path, &output)?;
        }
    }
    Ok(())
}

/// Logs every diagnostic of `output` and fails on a structural one.
fn report(path: &Path, output: &ParseOutput) -> anyhow::Result<()> {
    for d in output.all_diagnostics() {
        if d.is_fatal() {
            anyhow::bail!("{}: {}", path.display(), d);
        }
        let level = match d.severity {
            Severity::Error => log::Level::Error,
            Severity::Warning => log::Level::Warn,
            Severity::Information | Severity::Hint => log::Level::Info,
        };
        log::log!(level, "{}: {}", path.display(), d);
    }
    Ok(())
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

/// 1-based line and character column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |nl| nl + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let src = "ab\ncâu {x";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 3), (2, 1));
        // `{` follows "câu " which is five bytes but four characters
        assert_eq!(line_column(src, 8), (2, 5));
    }

    #[test]
    fn test_report_fails_only_on_structural_problems() {
        let parser = QuestionParser::default();
        let path = Path::new("de.tex");

        let err = report(path, &parser.parse("\\begin{ex}{\\end{ex}")).unwrap_err();
        assert!(err.to_string().starts_with("de.tex: unbalanced braces"));

        let output = parser.parse("\\begin{ex}%[9Q]\nQ\\end{ex}");
        assert_eq!(output.all_diagnostics().count(), 1);
        assert!(report(path, &output).is_ok());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b && c>d"), "a&lt;b &amp;&amp; c&gt;d");
    }
}
