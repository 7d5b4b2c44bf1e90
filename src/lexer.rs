//! Text lexer.
//!
//! Turns a text buffer into a flat, ordered [`Token`] stream. The lexer is
//! best-effort: it never fails as a whole. Characters it cannot make sense
//! of are reported as [`Diagnostic`]s, logged, and skipped.
//!
//! ```text
//! ; line comment
//! ;* block comment,
//!    may span lines *;
//! object cfg {
//!     string title "Hello World"
//!     float scale 1.5
//! }
//! ```
//!
//! Whitespace separates tokens and newlines end a logical line without
//! producing a token. `{` and `}` always stand alone, even when written flush
//! against a word. Quoted strings are taken verbatim with no escapes.

use crate::error::Diagnostic;
use crate::property::PropertyType;
use std::fmt;
use std::sync::Arc;

/// Lexical category of a [`Token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A reserved typename such as `int32` or `object`.
    Typename,
    Identifier,
    /// A double-quoted string.
    String,
    Integer,
    /// A number containing a `.`.
    Decimal,
    OpenBracket,
    CloseBracket,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Typename => "typename",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Integer => "integer",
            TokenKind::Decimal => "decimal",
            TokenKind::OpenBracket => "'{'",
            TokenKind::CloseBracket => "'}'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

/// A lexical unit with its source position.
///
/// `line` and `column` are 1-based; `column` counts characters from the start
/// of the logical line.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub symbol: String,
    pub kind: TokenKind,
    pub path: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub(crate) fn diagnostic(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(&self.path, self.line, self.column, message)
    }
}

/// Scans a text buffer into tokens.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    path: Arc<str>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, path: &str) -> Self {
        Lexer {
            input,
            position: 0,
            line: 1,
            column: 1,
            path: Arc::from(path),
            diagnostics: Vec::new(),
        }
    }

    /// Warnings collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else if ch == '\r' && self.peek_char() == Some('\n') {
            // column stays put, the following '\n' ends the line
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn warn(&mut self, line: usize, column: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(&self.path, line, column, message);
        tracing::warn!(
            path = %diagnostic.path,
            line = diagnostic.line,
            column = diagnostic.column,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    fn token(&self, symbol: String, kind: TokenKind, line: usize, column: usize) -> Token {
        Token {
            symbol,
            kind,
            path: Arc::clone(&self.path),
            line,
            column,
        }
    }

    fn is_separator(ch: char) -> bool {
        ch.is_whitespace() || ch.is_control() || ch == '{' || ch == '}'
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.next_char();
        }
    }

    fn skip_block_comment(&mut self) {
        let (line, column) = (self.line, self.column);
        self.next_char(); // ';'
        self.next_char(); // '*'
        loop {
            match self.next_char() {
                Some('*') if self.peek_char() == Some(';') => {
                    self.next_char();
                    return;
                }
                Some(_) => {}
                None => {
                    self.warn(line, column, "Unterminated block comment");
                    return;
                }
            }
        }
    }

    fn read_quoted(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        self.next_char(); // opening quote

        let mut symbol = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.next_char();
                    break;
                }
                Some('\n') | None => {
                    self.warn(line, column, "Unterminated string");
                    break;
                }
                Some('\r') if self.peek_second() == Some('\n') => {
                    self.warn(line, column, "Unterminated string");
                    break;
                }
                Some(ch) => {
                    symbol.push(ch);
                    self.next_char();
                }
            }
        }

        self.token(symbol, TokenKind::String, line, column)
    }

    fn read_word(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if Self::is_separator(ch) {
                break;
            }
            self.next_char();
        }
        let symbol = self.input[start..self.position].to_string();
        let kind = self.classify(&symbol, line, column);
        self.token(symbol, kind, line, column)
    }

    fn classify(&mut self, symbol: &str, line: usize, column: usize) -> TokenKind {
        let first = symbol.chars().next();
        if matches!(first, Some(c) if c.is_ascii_digit() || c == '-') {
            let mut kind = TokenKind::Integer;
            for ch in symbol.chars() {
                if ch != '.' {
                    continue;
                }
                if kind == TokenKind::Decimal {
                    self.warn(line, column, format!("Unexpected token in number \"{}\"", symbol));
                    break;
                }
                kind = TokenKind::Decimal;
            }
            kind
        } else if PropertyType::is_keyword(symbol) {
            TokenKind::Typename
        } else {
            TokenKind::Identifier
        }
    }

    /// Consumes the whole buffer. The returned stream always ends with a
    /// single [`TokenKind::Eof`] token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek_char() else {
                break;
            };

            match ch {
                ';' if self.peek_second() == Some('*') => self.skip_block_comment(),
                ';' => self.skip_line_comment(),
                '"' => tokens.push(self.read_quoted()),
                '{' | '}' => {
                    let (line, column) = (self.line, self.column);
                    self.next_char();
                    let kind = if ch == '{' {
                        TokenKind::OpenBracket
                    } else {
                        TokenKind::CloseBracket
                    };
                    tokens.push(self.token(ch.to_string(), kind, line, column));
                }
                c if c.is_control() => {
                    let (line, column) = (self.line, self.column);
                    self.warn(line, column, format!("Unexpected character {:?}", c));
                    self.next_char();
                }
                _ => tokens.push(self.read_word()),
            }
        }

        let eof = self.token(String::new(), TokenKind::Eof, self.line, self.column);
        tokens.push(eof);
        tokens
    }
}

/// Tokenizes `input`, logging and discarding any warnings.
pub fn tokenize(input: &str, path: &str) -> Vec<Token> {
    Lexer::new(input, path).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input, "test").into_iter().map(|t| t.kind).collect()
    }

    fn symbols(input: &str) -> Vec<String> {
        tokenize(input, "test")
            .into_iter()
            .map(|t| t.symbol)
            .collect()
    }

    #[test]
    fn test_scalar_line() {
        assert_eq!(
            kinds("int32 x 42"),
            vec![
                TokenKind::Typename,
                TokenKind::Identifier,
                TokenKind::Integer,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("  \n\t\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_brackets_split_words() {
        assert_eq!(symbols("cfg{x}"), vec!["cfg", "{", "x", "}", ""]);
        assert_eq!(
            kinds("{ }"),
            vec![TokenKind::OpenBracket, TokenKind::CloseBracket, TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 -4 1.5 -0.25 .5"),
            vec![
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Decimal,
                TokenKind::Decimal,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_malformed_number_stays_decimal() {
        let mut lexer = Lexer::new("1.2.3", "test");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Decimal);
        assert_eq!(tokens[0].symbol, "1.2.3");
        assert_eq!(lexer.diagnostics().len(), 1);
    }

    #[test]
    fn test_quoted_strings() {
        let tokens = tokenize("string s \"hello world\" string e \"\"", "test");
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].symbol, "hello world");
        assert_eq!(tokens[5].kind, TokenKind::String);
        assert_eq!(tokens[5].symbol, "");
    }

    #[test]
    fn test_quoted_keyword_is_string() {
        let tokens = tokenize("\"int32\" \"{\"", "test");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[1].kind, TokenKind::String);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("string s \"open\nint32 x 1", "test");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[2].symbol, "open");
        assert_eq!(tokens[3].kind, TokenKind::Typename);
        assert_eq!(lexer.diagnostics().len(), 1);
    }

    #[test]
    fn test_comments() {
        let input = "; header\nint32 a 1 ; trailing\n;* block\nstill comment *; int32 b 2";
        assert_eq!(
            symbols(input),
            vec!["int32", "a", "1", "int32", "b", "2", ""]
        );
    }

    #[test]
    fn test_semicolon_inside_word_is_not_comment() {
        assert_eq!(symbols("a;b"), vec!["a;b", ""]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("int32 a 1 ;* never closed", "test");
        let tokens = lexer.tokenize();
        assert_eq!(tokens.len(), 4);
        assert_eq!(lexer.diagnostics().len(), 1);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("object cfg {\r\n\tint32 x 42\n}", "cfg.acm");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 8));
        assert_eq!((tokens[2].line, tokens[2].column), (1, 12));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 2));
        assert_eq!((tokens[5].line, tokens[5].column), (2, 10));
        assert_eq!((tokens[6].line, tokens[6].column), (3, 1));
        assert_eq!(&*tokens[0].path, "cfg.acm");
    }

    #[test]
    fn test_control_characters_are_skipped() {
        let mut lexer = Lexer::new("int32\u{0} x 1", "test");
        let tokens = lexer.tokenize();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Typename,
                TokenKind::Identifier,
                TokenKind::Integer,
                TokenKind::Eof
            ]
        );
        assert_eq!(lexer.diagnostics().len(), 1);
    }
}
