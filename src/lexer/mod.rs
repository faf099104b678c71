//! Tokenization of Culebra source.
//!
//! The lexer is line-oriented: block structure comes from leading whitespace,
//! so every logical line starts with an indentation check against a stack of
//! widths and ends with a synthetic NEWLINE. Inside an open bracket pair line
//! breaks degrade to ordinary whitespace.

mod token;

pub use token::*;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{Error, Position, Result};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("if", TokenKind::If);
    m.insert("elif", TokenKind::Elif);
    m.insert("else", TokenKind::Else);
    m.insert("while", TokenKind::While);
    m.insert("for", TokenKind::For);
    m.insert("def", TokenKind::Def);
    m.insert("return", TokenKind::Return);
    m.insert("and", TokenKind::And);
    m.insert("or", TokenKind::Or);
    m.insert("not", TokenKind::Not);
    m.insert("true", TokenKind::True);
    m.insert("false", TokenKind::False);

    m
});

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    bracket_depth: usize,
    /// Whether the next significant character starts a logical line.
    at_line_start: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            col: 1,
            tokens: vec![],
            indents: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    pub fn lex(mut self) -> Result<Vec<Token>> {
        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                self.handle_indentation()?;
            }

            self.eat_inline_whitespace();

            let Some(c) = self.peek() else {
                break;
            };

            match c {
                '#' => self.eat_comment(),
                '\n' => self.handle_newline(),
                'a'..='z' | 'A'..='Z' | '_' => self.lex_identifier(),
                '0'..='9' => self.lex_number()?,
                '"' => self.lex_string()?,
                _ => self.lex_operator()?,
            }
        }

        self.finish()
    }

    fn finish(mut self) -> Result<Vec<Token>> {
        let position = self.here();

        // a file that ends without a trailing newline still terminates its
        // last logical line
        if matches!(
            self.tokens.last(),
            Some(token) if !matches!(token.kind, TokenKind::Newline | TokenKind::Dedent)
        ) {
            self.tokens
                .push(Token::new(TokenKind::Newline, "", position));
        }

        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", position));
        }

        self.tokens.push(Token::new(TokenKind::Eof, "", position));

        Ok(self.tokens)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }

        Some(c)
    }

    fn eat_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.advance();
        }

        // inside brackets a line break is just whitespace
        if self.bracket_depth > 0 && self.peek() == Some('\n') {
            self.advance();
            self.eat_inline_whitespace();
        }
    }

    fn eat_comment(&mut self) {
        while !matches!(self.peek(), None | Some('\n')) {
            self.advance();
        }
    }

    fn handle_newline(&mut self) {
        let position = self.here();
        self.advance();
        self.tokens
            .push(Token::new(TokenKind::Newline, "", position));
        self.at_line_start = true;
    }

    /// Measure the leading whitespace of the upcoming logical line and emit
    /// INDENT/DEDENT tokens against the indentation stack. Blank lines and
    /// comment-only lines are skipped entirely.
    fn handle_indentation(&mut self) -> Result<()> {
        loop {
            let mut width = 0;
            while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                self.advance();
                width += 1;
            }

            match self.peek() {
                None => return Ok(()),
                Some('\n') => {
                    self.advance();
                    continue;
                }
                Some('#') => {
                    self.eat_comment();
                    continue;
                }
                Some(_) => {
                    self.at_line_start = false;
                    return self.match_indent(width);
                }
            }
        }
    }

    fn match_indent(&mut self, width: usize) -> Result<()> {
        let position = self.here();
        let current = *self.indents.last().unwrap_or(&0);

        if width > current {
            self.indents.push(width);
            self.tokens.push(Token::new(TokenKind::Indent, "", position));
            return Ok(());
        }

        while width < *self.indents.last().unwrap_or(&0) {
            self.indents.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", position));
        }

        if width != *self.indents.last().unwrap_or(&0) {
            return Err(Error::indentation(
                position,
                format!(
                    "unindent to column {} does not match any outer block (expected {})",
                    width,
                    self.indents.last().unwrap_or(&0)
                ),
            ));
        }

        Ok(())
    }

    fn lex_identifier(&mut self) {
        let position = self.here();
        let start = self.position;

        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let name: String = self.chars[start..self.position].iter().collect();

        let kind = KEYWORDS
            .get(name.as_str())
            .cloned()
            .unwrap_or(TokenKind::Ident(name.clone()));

        self.tokens.push(Token::new(kind, name, position));
    }

    fn lex_number(&mut self) -> Result<()> {
        let position = self.here();
        let start = self.position;

        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }

        // a dot only belongs to the number when a digit follows, so `1.` can
        // never swallow a method-call dot
        let is_float = self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9'));

        if is_float {
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }

        let text: String = self.chars[start..self.position].iter().collect();

        let kind = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| Error::syntax(position, format!("invalid float literal '{text}'")))?;
            TokenKind::Float(value)
        } else {
            let value = text.parse::<i64>().map_err(|_| {
                Error::syntax(position, format!("integer literal '{text}' out of range"))
            })?;
            TokenKind::Int(value)
        };

        self.tokens.push(Token::new(kind, text, position));

        Ok(())
    }

    fn lex_string(&mut self) -> Result<()> {
        let position = self.here();
        let triple = self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"');

        let quote_len = if triple { 3 } else { 1 };
        for _ in 0..quote_len {
            self.advance();
        }

        let start = self.position;

        loop {
            match self.peek() {
                None => {
                    return Err(Error::syntax(position, "unterminated string literal"));
                }
                Some('\n') if !triple => {
                    return Err(Error::syntax(position, "unterminated string literal"));
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    if !triple
                        || (self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"'))
                    {
                        break;
                    }
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        let raw: String = self.chars[start..self.position].iter().collect();

        for _ in 0..quote_len {
            self.advance();
        }

        let value = unescape::unescape(&raw)
            .ok_or_else(|| Error::syntax(position, "invalid escape sequence in string literal"))?;

        self.tokens
            .push(Token::new(TokenKind::Str(value), raw, position));

        Ok(())
    }

    fn lex_operator(&mut self) -> Result<()> {
        let position = self.here();
        let c = self.advance().expect("caller checked for a character");

        // two-character operators win over their one-character prefixes
        let kind = match (c, self.peek()) {
            ('=', Some('=')) => {
                self.advance();
                TokenKind::Equal
            }
            ('!', Some('=')) => {
                self.advance();
                TokenKind::NotEqual
            }
            ('<', Some('=')) => {
                self.advance();
                TokenKind::LessEqual
            }
            ('>', Some('=')) => {
                self.advance();
                TokenKind::GreaterEqual
            }
            ('=', _) => TokenKind::Assign,
            ('<', _) => TokenKind::Less,
            ('>', _) => TokenKind::Greater,
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            (':', _) => TokenKind::Colon,
            (';', _) => TokenKind::Semicolon,
            (',', _) => TokenKind::Comma,
            ('.', _) => TokenKind::Dot,
            ('(', _) => {
                self.bracket_depth += 1;
                TokenKind::LParen
            }
            (')', _) => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RParen
            }
            ('[', _) => {
                self.bracket_depth += 1;
                TokenKind::LBracket
            }
            (']', _) => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBracket
            }
            ('{', _) => {
                self.bracket_depth += 1;
                TokenKind::LBrace
            }
            ('}', _) => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBrace
            }
            _ => {
                return Err(Error::syntax(position, format!("unknown character '{c}'")));
            }
        };

        self.tokens.push(Token::new(kind, c.to_string(), position));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex()
            .expect("lexing should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_arithmetic_line() {
        assert_eq!(
            kinds("1 + 2 * 3"),
            vec![
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Int(2),
                TokenKind::Star,
                TokenKind::Int(3),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_keywords_and_identifiers() {
        assert_eq!(
            kinds("if forty for"),
            vec![
                TokenKind::If,
                TokenKind::Ident("forty".into()),
                TokenKind::For,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_two_char_operators() {
        assert_eq!(
            kinds("a <= b == c != d >= e"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::LessEqual,
                TokenKind::Ident("b".into()),
                TokenKind::Equal,
                TokenKind::Ident("c".into()),
                TokenKind::NotEqual,
                TokenKind::Ident("d".into()),
                TokenKind::GreaterEqual,
                TokenKind::Ident("e".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_indent_dedent() {
        let input = "if x:\n    y = 1\nz = 2\n";

        assert_eq!(
            kinds(input),
            vec![
                TokenKind::If,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Ident("y".into()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Ident("z".into()),
                TokenKind::Assign,
                TokenKind::Int(2),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_dedent_at_eof() {
        let input = "while x:\n    while y:\n        z = 1\n";
        let tokens = kinds(input);

        let dedents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Dedent))
            .count();
        let indents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Indent))
            .count();

        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
        assert_eq!(tokens.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_lex_blank_lines_and_comments_ignored() {
        let input = "a = 1\n\n# a comment\n    # indented comment\nb = 2\n";

        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Assign,
                TokenKind::Int(2),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_newline_suppressed_in_brackets() {
        let input = "a = [1,\n     2]\n";

        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Assign,
                TokenKind::LBracket,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::RBracket,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_float_and_method_dot() {
        assert_eq!(
            kinds("3.14 nums.sort()"),
            vec![
                TokenKind::Float(3.14),
                TokenKind::Ident("nums".into()),
                TokenKind::Dot,
                TokenKind::Ident("sort".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_string_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![
                TokenKind::Str("a\nb".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_triple_quoted_string() {
        let input = "s = \"\"\"line one\nline two\"\"\"\n";

        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Ident("s".into()),
                TokenKind::Assign,
                TokenKind::Str("line one\nline two".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_unterminated_string() {
        let result = Lexer::new("\"abc").lex();

        assert!(matches!(
            result,
            Err(Error { kind: crate::error::ErrorKind::Syntax, .. })
        ));
    }

    #[test]
    fn test_lex_mismatched_dedent() {
        let input = "if x:\n    y = 1\n  z = 2\n";
        let result = Lexer::new(input).lex();

        assert!(matches!(
            result,
            Err(Error { kind: crate::error::ErrorKind::Indentation, .. })
        ));
    }

    #[test]
    fn test_lex_positions() {
        let tokens = Lexer::new("x = 1").lex().expect("lexing should succeed");

        assert_eq!(tokens[0].position, Position::new(1, 1));
        assert_eq!(tokens[1].position, Position::new(1, 3));
        assert_eq!(tokens[2].position, Position::new(1, 5));
    }

    #[test]
    fn test_lex_unknown_character() {
        let result = Lexer::new("a ? b").lex();

        assert!(result.is_err());
    }
}
