//! Hook for turning formulas into display markup.
//!
//! Typesetting is not done here. The host supplies a [`FormulaRenderer`]
//! (a KaTeX binding, a MathJax bridge, a test stub) and
//! [`render_math_spans`] calls it for each formula in a piece of question
//! text, copying everything else unchanged.

/// Renders one formula. `display` is true for `$$...$$` and `\[...\]`.
pub trait FormulaRenderer {
    fn render(&self, formula: &str, display: bool) -> String;
}

impl<F> FormulaRenderer for F
where
    F: Fn(&str, bool) -> String,
{
    fn render(&self, formula: &str, display: bool) -> String {
        self(formula, display)
    }
}

/// Replaces every `$...$`, `$$...$$` and `\[...\]` span of `text` with the
/// renderer's markup.
///
/// Escaped dollars (`\$`) are text. A span without its closing delimiter is
/// left as written.
///
/// ```
/// use texbank_question::render::render_math_spans;
///
/// let html = render_math_spans(r"Tính $x^2$ khi \[x=2\]", &|f: &str, display: bool| {
///     if display { format!("<div>{f}</div>") } else { format!("<i>{f}</i>") }
/// });
/// assert_eq!(html, "Tính <i>x^2</i> khi <div>x=2</div>");
/// ```
pub fn render_math_spans<R: FormulaRenderer + ?Sized>(text: &str, renderer: &R) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(c) = text[pos..].chars().next() {
        let rest = &text[pos..];
        let opener = if rest.starts_with("$$") {
            Some(("$$", "$$", true))
        } else if rest.starts_with('$') {
            Some(("$", "$", false))
        } else if rest.starts_with("\\[") {
            Some(("\\[", "\\]", true))
        } else {
            None
        };

        match opener {
            Some((open, close, display)) => {
                let start = pos + open.len();
                match find_closer(text, start, close) {
                    Some(end) => {
                        out.push_str(&renderer.render(&text[start..end], display));
                        pos = end + close.len();
                    }
                    None => {
                        out.push_str(rest);
                        pos = text.len();
                    }
                }
            }
            None if c == '\\' => {
                // copy an escape pair as is so `\$` is never an opener
                let len = rest[1..].chars().next().map_or(1, |n| 1 + n.len_utf8());
                out.push_str(&rest[..len]);
                pos += len;
            }
            None => {
                out.push(c);
                pos += c.len_utf8();
            }
        }
    }
    out
}

fn find_closer(text: &str, from: usize, close: &str) -> Option<usize> {
    let mut pos = from;
    while let Some(c) = text[pos..].chars().next() {
        if text[pos..].starts_with(close) {
            return Some(pos);
        }
        if c == '\\' {
            pos += 1;
            match text[pos..].chars().next() {
                Some(n) => pos += n.len_utf8(),
                None => return None,
            }
        } else {
            pos += c.len_utf8();
        }
    }
    None
}
