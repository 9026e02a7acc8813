use crate::SyntaxKind;

/// A single lexed token: its kind, the source slice it covers, and the byte
/// offset where that slice starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: usize,
}

/// A lexer for question-bank LaTeX.
///
/// ## Overview
///
/// The lexer performs **character-level scanning** of the source and yields
/// [`Token`]s. It recognizes:
///
/// - **Commands**: `\choice`, `\True`, and single-symbol escapes like `\{` or `\%`
/// - **Delimiters**: `{`, `}`, `[`, `]`
/// - **Math shifts**: `$` and `$$`
/// - **Comments**: `%` through end of line
/// - **Whitespace**: consecutive whitespace collapsed into one token
/// - **Text**: everything else, consumed greedily until a special character
///
/// Escaped delimiters are commands, so `\{` never shows up as [`SyntaxKind::LBrace`].
///
/// ## Examples
///
/// ```
/// use texbank_syntax::lexer::Lexer;
/// use texbank_syntax::SyntaxKind;
///
/// let tokens: Vec<_> = Lexer::new(r"\choice{2} % note").collect();
///
/// assert_eq!(tokens[0].kind, SyntaxKind::Command); // \choice
/// assert_eq!(tokens[1].kind, SyntaxKind::LBrace);  // {
/// assert_eq!(tokens[2].text, "2");
/// assert_eq!(tokens[5].kind, SyntaxKind::Comment);
/// assert_eq!(tokens[5].offset, 11);
/// ```
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) {
        while let Some(n) = self.peek_char() {
            if pred(n) {
                self.position += n.len_utf8();
            } else {
                break;
            }
        }
    }

    /// Returns the next token, or a [`SyntaxKind::Eof`] token at end of input.
    pub fn next_token(&mut self) -> Token<'a> {
        let start = self.position;
        let Some(c) = self.peek_char() else {
            return Token {
                kind: SyntaxKind::Eof,
                text: "",
                offset: start,
            };
        };
        self.position += c.len_utf8();

        let kind = match c {
            '\\' => {
                match self.peek_char() {
                    Some(next) if next.is_alphabetic() => {
                        self.eat_while(char::is_alphabetic);
                    }
                    Some(next) => {
                        // \{ \} \% \$ \\ and friends
                        self.position += next.len_utf8();
                    }
                    None => {}
                }
                SyntaxKind::Command
            }
            '{' => SyntaxKind::LBrace,
            '}' => SyntaxKind::RBrace,
            '[' => SyntaxKind::LBracket,
            ']' => SyntaxKind::RBracket,
            '$' => {
                if self.peek_char() == Some('$') {
                    self.position += 1;
                }
                SyntaxKind::Dollar
            }
            '%' => {
                self.eat_while(|n| n != '\n' && n != '\r');
                SyntaxKind::Comment
            }
            c if c.is_whitespace() => {
                self.eat_while(char::is_whitespace);
                SyntaxKind::Whitespace
            }
            _ => {
                self.eat_while(|n| {
                    !matches!(n, '\\' | '{' | '}' | '[' | ']' | '%' | '$') && !n.is_whitespace()
                });
                SyntaxKind::Text
            }
        };

        Token {
            kind,
            text: &self.input[start..self.position],
            offset: start,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == SyntaxKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}
