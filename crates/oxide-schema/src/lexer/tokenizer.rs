//! DDL tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// Characters that may continue a PostgreSQL operator symbol such as `~*` or `@>`.
const OPERATOR_CHARS: &str = "~!@#^&|?<>=*";

/// A lexer that tokenizes DDL input.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            // Block comments nest in PostgreSQL.
            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                let mut depth = 1usize;
                while depth > 0 {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            depth -= 1;
                        }
                        Some('/') if self.peek() == Some('*') => {
                            self.advance();
                            depth += 1;
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                continue;
            }

            break;
        }
    }

    /// Creates a token spanning from the token start to the current position.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        Keyword::from_str(text).map_or_else(
            || self.make_token(TokenKind::Identifier(text.to_string())),
            |keyword| self.make_token(TokenKind::Keyword(keyword)),
        )
    }

    /// Scans a double-quoted identifier. Doubled quotes are unescaped.
    fn scan_quoted_identifier(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('"') if self.peek() == Some('"') => {
                    self.advance();
                    value.push('"');
                }
                Some('"') => break,
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(
                        "Unterminated quoted identifier".to_string(),
                    ));
                }
            }
        }

        if value.is_empty() {
            return self.make_token(TokenKind::Error(
                "Zero-length quoted identifier".to_string(),
            ));
        }
        self.make_token(TokenKind::QuotedIdentifier(value))
    }

    /// Scans a number (integer, decimal or exponent form).
    fn scan_number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            let mark = self.pos;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = mark;
            }
        }

        let text = &self.input[self.start..self.pos];
        self.make_token(TokenKind::Number(text.to_string()))
    }

    /// Scans a single-quoted string literal.
    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                    value.push('\'');
                }
                Some('\'') => break,
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(
                        "Unterminated string literal".to_string(),
                    ));
                }
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans a run of operator characters into a single operator token.
    fn scan_operator(&mut self) -> Token {
        while self.peek().is_some_and(|c| OPERATOR_CHARS.contains(c)) {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];
        match text {
            "||" => self.make_token(TokenKind::Concat),
            "!=" => self.make_token(TokenKind::NotEq),
            _ => self.make_token(TokenKind::Operator(text.to_string())),
        }
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '-' => self.make_token(TokenKind::Minus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '=' => self.make_token(TokenKind::Eq),
            ':' => {
                if self.peek() == Some(':') {
                    self.advance();
                    self.make_token(TokenKind::DoubleColon)
                } else {
                    self.make_token(TokenKind::Error("Unexpected character: :".to_string()))
                }
            }
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos = self.start;
                    self.scan_number()
                } else {
                    self.make_token(TokenKind::Dot)
                }
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                }
                Some(c) if c != '<' && OPERATOR_CHARS.contains(c) => self.scan_operator(),
                _ => self.make_token(TokenKind::Lt),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '~' | '!' | '@' | '#' | '^' | '&' | '|' | '?' => self.scan_operator(),

            '\'' => {
                self.pos = self.start;
                self.scan_string()
            }

            '"' => {
                self.pos = self.start;
                self.scan_quoted_identifier()
            }

            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }

            c if c.is_alphabetic() || c == '_' => {
                self.pos = self.start;
                self.scan_identifier()
            }

            _ => self.make_token(TokenKind::Error(format!("Unexpected character: {c}"))),
        }
    }

    /// Tokenizes the entire input and returns all tokens, ending with `Eof`.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
