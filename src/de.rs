//! Text parsing.
//!
//! This module turns the token stream produced by the [`Lexer`] into a
//! [`Branch`] tree with a recursive-descent [`Parser`].
//!
//! ## Grammar
//!
//! ```text
//! branch  := scalar | object | array
//! scalar  := TYPENAME NAME VALUE
//! object  := "object" NAME? '{' branch* '}'
//! array   := "array" TYPENAME NAME '{' element* '}'
//! element := VALUE | '{' branch* '}'
//! ```
//!
//! `NAME` is an identifier or a quoted string. The token kinds allowed for
//! `VALUE` depend on the typename (`int32 x 1.5` is rejected).
//!
//! ## Recovery
//!
//! In [`ParseMode::Lenient`](crate::ParseMode) a malformed branch is logged,
//! recorded as a [`Diagnostic`], and dropped; its siblings are still parsed.
//! If the root itself is malformed there is no tree. A value of the right
//! token kind that does not read as its type (`int8 x 300`) is not
//! malformed: it is kept as written and only flagged, and typed reads of it
//! fail later. In [`ParseMode::Strict`](crate::ParseMode) the first problem
//! of either sort aborts the parse.
//!
//! ```rust
//! use acm::{from_str, from_str_with_options, ErrorCode, ParseOptions};
//!
//! let text = "object cfg { int32 bad 1.5 int8 small 300 int32 x 42 }";
//! let root = from_str(text).unwrap();
//! assert_eq!(root.len(), 2);
//! assert_eq!(root.get_string("small", ""), "300");
//! let small = root.child_by_name("small").unwrap().unwrap();
//! assert_eq!(small.value::<i8>().unwrap_err().code(), ErrorCode::InvalidArgument);
//!
//! assert!(from_str_with_options(text, ParseOptions::strict()).is_err());
//! ```

use crate::branch::{self, Branch};
use crate::error::Diagnostic;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::options::ParseOptions;
use crate::{Error, PropertyType, Result};

/// Outcome of a parse: the tree, if one could be built, plus every warning
/// raised on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed {
    pub root: Option<Branch>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    /// Returns the root, or a syntax error built from the last diagnostic
    /// when no tree was produced.
    pub fn into_root(self) -> Result<Branch> {
        match self.root {
            Some(root) => Ok(root),
            None => Err(self
                .diagnostics
                .last()
                .map(Error::syntax)
                .unwrap_or_else(|| Error::io_read("no root branch"))),
        }
    }
}

/// A production either yields a branch or the diagnostic explaining why not.
type Step<T> = std::result::Result<T, Diagnostic>;

/// Recursive-descent parser over a token stream.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    options: &'a ParseOptions,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `tokens`, which must end with an EOF token as
    /// produced by [`Lexer::tokenize`].
    pub fn new(tokens: Vec<Token>, options: &'a ParseOptions) -> Self {
        Parser {
            tokens,
            position: 0,
            options,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().map_or(TokenKind::Eof, |t| t.kind)
    }

    /// Consumes and returns the current token. EOF is never consumed.
    fn next(&mut self) -> Step<Token> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| Diagnostic::new(&self.options.source, 1, 1, "Empty token stream"))?;
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        Ok(token)
    }

    fn here(&self, message: impl Into<String>) -> Diagnostic {
        match self.peek() {
            Some(token) => token.diagnostic(message),
            None => Diagnostic::new(&self.options.source, 1, 1, message),
        }
    }

    /// Records a recoverable problem. Strict mode turns it into an error.
    fn report(&mut self, diagnostic: Diagnostic) -> Step<()> {
        if self.options.is_strict() {
            return Err(diagnostic);
        }
        tracing::warn!(
            path = %diagnostic.path,
            line = diagnostic.line,
            column = diagnostic.column,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    /// Skips tokens up to and including the `}` matching an already
    /// consumed `{`.
    fn skip_block(&mut self) {
        let mut nesting = 1usize;
        while nesting > 0 {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::OpenBracket => nesting += 1,
                TokenKind::CloseBracket => nesting -= 1,
                _ => {}
            }
            self.position += 1;
        }
    }

    /// Enters a container body whose `{` was just consumed.
    fn enter(&mut self, start: &Token) -> Step<()> {
        if self.depth >= self.options.max_depth {
            self.skip_block();
            return Err(start.diagnostic(format!(
                "Nesting exceeds maximum depth of {}",
                self.options.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Parses a whole document: exactly one root branch.
    pub fn parse_document(mut self) -> Result<Parsed> {
        if self.peek_kind() == TokenKind::Eof {
            let diagnostic = self.here("Empty document");
            return self.fail(diagnostic);
        }

        let root = match self.parse_branch() {
            Ok(root) => root,
            Err(diagnostic) => return self.fail(diagnostic),
        };

        if self.peek_kind() != TokenKind::Eof {
            let symbol = self.peek().map(|t| t.symbol.clone()).unwrap_or_default();
            let diagnostic =
                self.here(format!("Unexpected token \"{}\" after root branch", symbol));
            self.report(diagnostic).map_err(|d| Error::syntax(&d))?;
        }

        Ok(Parsed {
            root: Some(root),
            diagnostics: self.diagnostics,
        })
    }

    fn fail(mut self, diagnostic: Diagnostic) -> Result<Parsed> {
        self.report(diagnostic).map_err(|d| Error::syntax(&d))?;
        Ok(Parsed {
            root: None,
            diagnostics: self.diagnostics,
        })
    }

    /// Parses one branch starting at a typename.
    pub fn parse_branch(&mut self) -> Step<Branch> {
        let token = self.next()?;
        if token.kind != TokenKind::Typename {
            return Err(token.diagnostic(format!(
                "Unexpected {} \"{}\", expected a typename",
                token.kind, token.symbol
            )));
        }

        let ty = PropertyType::from_keyword(&token.symbol)
            .ok_or_else(|| token.diagnostic(format!("Unknown typename \"{}\"", token.symbol)))?;
        match ty {
            PropertyType::Object => self.parse_object(&token),
            PropertyType::Array => self.parse_array(&token),
            _ => self.parse_scalar(&token, ty),
        }
    }

    fn parse_name(&mut self, after: &Token) -> Step<Option<String>> {
        match self.peek_kind() {
            TokenKind::Identifier | TokenKind::String => {
                let token = self.next()?;
                Ok(Some(token.symbol).filter(|s| !s.is_empty()))
            }
            kind => Err(self.here(format!(
                "Expected identifier to follow {}, found {}",
                after.symbol, kind
            ))),
        }
    }

    fn expect_open(&mut self, what: &str) -> Step<Token> {
        if self.peek_kind() != TokenKind::OpenBracket {
            return Err(self.here(format!("No opening bracket following {}", what)));
        }
        self.next()
    }

    /// Skips the rest of a malformed header along with the block it opens.
    /// Stops early at a typename or `}` so the enclosing container can
    /// carry on.
    fn recover_block(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof | TokenKind::CloseBracket | TokenKind::Typename => return,
                TokenKind::OpenBracket => {
                    self.position += 1;
                    self.skip_block();
                    return;
                }
                _ => self.position += 1,
            }
        }
    }

    fn parse_object(&mut self, keyword: &Token) -> Step<Branch> {
        let header = match self.peek_kind() {
            TokenKind::OpenBracket => Ok(None),
            _ => self.parse_name(keyword),
        }
        .and_then(|name| Ok((name, self.expect_open("object")?)));

        match header {
            Ok((name, open)) => self.parse_object_body(name, &open),
            Err(diagnostic) => {
                self.recover_block();
                Err(diagnostic)
            }
        }
    }

    fn parse_object_body(&mut self, name: Option<String>, open: &Token) -> Step<Branch> {
        self.enter(open)?;
        let mut object = Branch::container(name, PropertyType::Object, None);

        let result = loop {
            match self.peek_kind() {
                TokenKind::CloseBracket => {
                    self.position += 1;
                    break Ok(());
                }
                TokenKind::Eof => break Err(open.diagnostic("No closing bracket following object")),
                _ => {
                    let child = self.parse_branch();
                    if let Err(d) = self.attach(&mut object, child, open) {
                        break Err(d);
                    }
                }
            }
        };

        self.depth -= 1;
        result.map(|()| object)
    }

    fn attach(&mut self, parent: &mut Branch, child: Step<Branch>, at: &Token) -> Step<()> {
        match child {
            Ok(child) => match parent.push_branch(child) {
                Ok(_) => Ok(()),
                Err(e) => self.report(at.diagnostic(e.to_string())),
            },
            Err(diagnostic) => self.report(diagnostic),
        }
    }

    fn parse_array_header(&mut self) -> Step<(PropertyType, Option<String>, Token)> {
        let type_token = self.next()?;
        if type_token.kind != TokenKind::Typename {
            return Err(type_token.diagnostic(format!(
                "Expected typename to follow array ({})",
                type_token.symbol
            )));
        }
        let child_type = PropertyType::from_keyword(&type_token.symbol)
            .filter(|ty| *ty != PropertyType::Array)
            .ok_or_else(|| {
                type_token.diagnostic(format!(
                    "Invalid typename following array ({})",
                    type_token.symbol
                ))
            })?;

        let name = self.parse_name(&type_token)?;
        let open = self.expect_open("array")?;
        Ok((child_type, name, open))
    }

    fn parse_array(&mut self, keyword: &Token) -> Step<Branch> {
        let (child_type, name, open) = match self.parse_array_header() {
            Ok(header) => header,
            Err(diagnostic) => {
                self.recover_block();
                return Err(diagnostic);
            }
        };
        self.enter(&open)?;

        let mut array = Branch::container(name, PropertyType::Array, Some(child_type));
        let result = loop {
            match self.peek_kind() {
                TokenKind::CloseBracket => {
                    self.position += 1;
                    break Ok(());
                }
                TokenKind::Eof => {
                    break Err(keyword.diagnostic("No closing bracket following array"))
                }
                _ => {
                    let element = if child_type == PropertyType::Object {
                        self.parse_object_element()
                    } else {
                        self.parse_element(child_type)
                    };
                    if let Err(d) = self.attach(&mut array, element, &open) {
                        break Err(d);
                    }
                }
            }
        };

        self.depth -= 1;
        result.map(|()| array)
    }

    fn parse_object_element(&mut self) -> Step<Branch> {
        let token = self.next()?;
        if token.kind != TokenKind::OpenBracket {
            return Err(token.diagnostic(format!(
                "Expected '{{' to open array element, found {} \"{}\"",
                token.kind, token.symbol
            )));
        }
        self.parse_object_body(None, &token)
    }

    fn parse_element(&mut self, ty: PropertyType) -> Step<Branch> {
        let token = self.next()?;
        if token.kind == TokenKind::OpenBracket {
            self.skip_block();
            return Err(token.diagnostic(format!("Unexpected block in array of {}", ty)));
        }
        self.scalar(None, ty, &token)
    }

    fn parse_scalar(&mut self, keyword: &Token, ty: PropertyType) -> Step<Branch> {
        let name = self.parse_name(keyword)?;

        match self.peek_kind() {
            TokenKind::CloseBracket | TokenKind::Eof => {
                return Err(self.here(format!(
                    "Unexpected end of input for {} \"{}\"",
                    ty,
                    name.unwrap_or_default()
                )))
            }
            TokenKind::OpenBracket => {
                let open = self.next()?;
                self.skip_block();
                return Err(open.diagnostic(format!("Unexpected block for {} value", ty)));
            }
            _ => {}
        }

        let value = self.next()?;
        self.scalar(name, ty, &value)
    }

    /// Builds a scalar once the value token is known to be of an accepted
    /// kind. Text that does not read as `ty` is kept as written and flagged.
    fn scalar(&mut self, name: Option<String>, ty: PropertyType, value: &Token) -> Step<Branch> {
        if !ty.accepts(value.kind) {
            return Err(value.diagnostic(format!(
                "Unexpected value type for {} ({} \"{}\")",
                ty, value.kind, value.symbol
            )));
        }
        if !branch::is_valid_text(ty, &value.symbol) {
            self.report(value.diagnostic(format!("Invalid {} value \"{}\"", ty, value.symbol)))?;
        }
        Ok(Branch::from_text(name, ty, value.symbol.clone()))
    }
}

/// Lexes and parses `input`.
///
/// Lexer warnings are included in the returned diagnostics and are fatal in
/// strict mode.
pub fn parse(input: &str, options: &ParseOptions) -> Result<Parsed> {
    let mut lexer = Lexer::new(input, &options.source);
    let tokens = lexer.tokenize();
    let lexed = lexer.into_diagnostics();

    if options.is_strict() {
        if let Some(first) = lexed.first() {
            return Err(Error::syntax(first));
        }
    }

    let mut parser = Parser::new(tokens, options);
    parser.diagnostics = lexed;
    parser.parse_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    fn lenient(input: &str) -> Parsed {
        parse(input, &ParseOptions::default()).unwrap()
    }

    fn strict(input: &str) -> Result<Parsed> {
        parse(input, &ParseOptions::strict())
    }

    #[test]
    fn test_object_with_scalars() {
        let root = lenient("object cfg { int32 x 42 bool flag true }")
            .into_root()
            .unwrap();
        assert_eq!(root.name(), Some("cfg"));
        assert_eq!(root.len(), 2);
        let x = root.child(0).unwrap();
        assert_eq!(
            (x.property_type(), x.name(), x.text()),
            (PropertyType::Int32, Some("x"), Some("42"))
        );
        assert_eq!(root.get_int("x", 0), 42);
        assert!(root.get_bool("flag", false));
    }

    #[test]
    fn test_array_of_scalars() {
        let root = lenient("object cfg { array int32 nums { 1 2 3 } }")
            .into_root()
            .unwrap();
        let nums = root.child_by_name("nums").unwrap().unwrap();
        assert_eq!(nums.property_type(), PropertyType::Array);
        assert_eq!(nums.child_type(), Some(PropertyType::Int32));
        let texts: Vec<_> = nums.iter().map(|c| c.text().unwrap()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert!(nums.iter().all(|c| c.name().is_none()));
    }

    #[test]
    fn test_array_of_objects() {
        let text = "object level { array object actors { { string class door } { int32 id 2 } } }";
        let root = lenient(text).into_root().unwrap();
        let actors = root.child_by_name("actors").unwrap().unwrap();
        assert_eq!(actors.len(), 2);
        assert_eq!(actors.child(0).unwrap().get_string("class", ""), "door");
        assert_eq!(actors.child(1).unwrap().name(), None);
    }

    #[test]
    fn test_nested_objects_and_aliases() {
        let text = r#"
            object game {
                object "video settings" {
                    uint width 1920
                    int depth -1
                    float gamma 2
                    float64 scale 0.5
                    string title "Hello World"
                    string bare word
                }
            }
        "#;
        let root = lenient(text).into_root().unwrap();
        let video = root.child_by_name("video settings").unwrap().unwrap();
        assert_eq!(
            video.child_by_name("width").unwrap().unwrap().property_type(),
            PropertyType::UInt32
        );
        assert_eq!(video.get_int("depth", 0), -1);
        assert_eq!(video.get_f32("gamma", 0.0), 2.0);
        assert_eq!(video.get_string("title", ""), "Hello World");
        assert_eq!(video.get_string("bare", ""), "word");
    }

    #[test]
    fn test_missing_closing_bracket_yields_no_root() {
        let parsed = lenient("object cfg { int32 x 42");
        assert!(parsed.root.is_none());
        assert!(!parsed.diagnostics.is_empty());
        let err = parsed.into_root().unwrap_err();
        assert_eq!(err.code(), ErrorCode::IoRead);
        assert!(matches!(err, Error::Syntax { line: 1, col: 12, .. }));
    }

    #[test]
    fn test_malformed_child_is_dropped() {
        let parsed = lenient("object cfg { int32 a 1.5 int32 b 2 array array c { } int32 d 4 }");
        let root = parsed.root.unwrap();
        let names: Vec<_> = root.iter().map(|c| c.name().unwrap()).collect();
        assert!(names.contains(&"b"));
        assert!(names.contains(&"d"));
        assert!(!names.contains(&"a"));
        assert!(parsed.diagnostics.len() >= 2);
    }

    #[test]
    fn test_strict_mode_fails_fast() {
        let err = strict("object cfg { int32 a 1.5 int32 b 2 }").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, col: 22, .. }));

        let err = strict("object cfg { int32 x 1 } trailing").unwrap_err();
        assert_eq!(err.code(), ErrorCode::IoRead);

        assert!(strict("object cfg { string s \"open }").is_err());
    }

    #[test]
    fn test_value_kind_table() {
        assert!(lenient("object c { int32 x abc }").root.unwrap().is_empty());
        assert!(lenient("object c { int32 x 1.5 }").root.unwrap().is_empty());
        assert!(lenient("object c { bool b 1 }").root.unwrap().is_empty());
        assert_eq!(lenient("object c { bool b \"1\" }").root.unwrap().len(), 1);
        assert_eq!(lenient("object c { float f 3 }").root.unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_values_are_kept_as_text() {
        let parsed = lenient("object c { float f 1.2.3 bool b yes int8 s 300 uint8 u -1 }");
        let root = parsed.root.unwrap();
        let kept: Vec<_> = root
            .iter()
            .map(|c| (c.property_type(), c.text().unwrap()))
            .collect();
        assert_eq!(
            kept,
            vec![
                (PropertyType::Float32, "1.2.3"),
                (PropertyType::Bool, "yes"),
                (PropertyType::Int8, "300"),
                (PropertyType::UInt8, "-1"),
            ]
        );
        // the lexer flags 1.2.3 once more
        assert_eq!(parsed.diagnostics.len(), 5);

        let s = root.child_by_name("s").unwrap().unwrap();
        assert_eq!(s.value::<i8>().unwrap_err().code(), ErrorCode::InvalidArgument);
        assert!(root.get_bool("b", true));
        assert_eq!(root.get_uint("u", 7), 7);

        let err = strict("object c { int8 s 300 }").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, col: 19, .. }));
    }

    #[test]
    fn test_array_element_type_checks() {
        let root = lenient("object c { array int16 v { 1 x 3 } }").root.unwrap();
        let v = root.child_by_name("v").unwrap().unwrap();
        assert_eq!(v.array_values::<i16>(None).unwrap(), vec![1, 3]);

        let root = lenient("object c { array object v { int32 x 1 { } } }").root.unwrap();
        assert_eq!(root.child_by_name("v").unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_anonymous_root_object_and_scalar_root() {
        let root = lenient("object { int32 x 1 }").into_root().unwrap();
        assert_eq!(root.name(), None);

        let root = lenient("int32 answer 42").into_root().unwrap();
        assert_eq!(root.value::<i32>().unwrap(), 42);
    }

    #[test]
    fn test_empty_document() {
        assert!(lenient("; nothing here\n").root.is_none());
        assert!(strict("").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions::default().with_max_depth(2);
        let parsed = parse("object a { object b { object c { int32 x 1 } } int32 y 2 }", &options)
            .unwrap();
        let root = parsed.root.unwrap();
        let b = root.child_by_name("b").unwrap().unwrap();
        assert!(b.is_empty());
        assert_eq!(root.get_int("y", 0), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_diagnostics_carry_source() {
        let options = ParseOptions::default().with_source("levels/e1m1.acm");
        let parsed = parse("object cfg {\n\tint32 x nope\n}", &options).unwrap();
        let diag = &parsed.diagnostics[0];
        assert_eq!(diag.path, "levels/e1m1.acm");
        assert_eq!((diag.line, diag.column), (2, 10));
    }
}
