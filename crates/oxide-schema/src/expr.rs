//! Canonical text for opaque default and check expressions.
//!
//! Expressions are not interpreted. They are re-tokenized and re-joined so
//! that `DEFAULT 'active'` from a schema file and `'active'::character
//! varying` reported by the catalog compare equal.

use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::model::ident::quote_identifier;
use crate::parser::ParseError;

/// Cast targets after which a quoted numeric literal is rewritten as a bare number.
const NUMERIC_CAST_TARGETS: &[&str] = &[
    "smallint", "integer", "bigint", "int", "int2", "int4", "int8", "numeric", "decimal", "real",
    "double", "float4", "float8",
];

/// Keywords that may continue a multi-word type name after `::`.
const TYPE_NAME_CONTINUATIONS: &[Keyword] = &[
    Keyword::Precision,
    Keyword::Varying,
    Keyword::With,
    Keyword::Without,
    Keyword::Time,
    Keyword::Zone,
];

/// Normalizes free-standing expression text, e.g. a catalog default.
///
/// # Errors
///
/// Returns a [`ParseError`] positioned within `text` when it cannot be
/// tokenized or its parentheses do not balance.
pub fn normalize_expression(text: &str) -> Result<String, ParseError> {
    let tokens = Lexer::new(text).tokenize();
    let mut depth = 0usize;
    for token in &tokens {
        match &token.kind {
            TokenKind::Error(reason) => return Err(ParseError::at(text, token.span, reason.clone())),
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    ParseError::at(text, token.span, "unbalanced ')' in expression")
                })?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        let end = tokens.last().map(|t| t.span).unwrap_or_default();
        return Err(ParseError::at(text, end, "unbalanced '(' in expression"));
    }
    let body: Vec<Token> = tokens.into_iter().filter(|t| !t.is_eof()).collect();
    if body.is_empty() {
        return Err(ParseError::at(text, Default::default(), "empty expression"));
    }
    Ok(normalize_tokens(&body))
}

/// Normalizes an already tokenized expression. Tokens must not contain
/// `Eof` or lexer errors.
#[must_use]
pub fn normalize_tokens(tokens: &[Token]) -> String {
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind.clone()).collect();
    let mut kinds = strip_literal_casts(kinds);
    strip_outer_parens(&mut kinds);
    render(&kinds)
}

/// Returns true when `expression` refers to the identifier `name`.
#[must_use]
pub fn mentions_identifier(expression: &str, name: &str) -> bool {
    Lexer::new(expression)
        .tokenize()
        .iter()
        .any(|token| match &token.kind {
            TokenKind::Identifier(s) => s.to_lowercase() == name,
            TokenKind::QuotedIdentifier(s) => s == name,
            TokenKind::Keyword(kw) => !kw.is_reserved() && kw.as_str().to_lowercase() == name,
            _ => false,
        })
}

fn is_literal(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::String(_) | TokenKind::Number(_))
}

/// Removes `::type` casts applied directly to literals, including the
/// parenthesized `(0)::numeric` form the catalog prints inside checks.
fn strip_literal_casts(tokens: Vec<TokenKind>) -> Vec<TokenKind> {
    let mut out: Vec<TokenKind> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token == TokenKind::DoubleColon {
            if let Some(literal) = take_cast_operand(&mut out) {
                let target = skip_type_name(&mut iter);
                push_literal(&mut out, literal, &target);
                continue;
            }
        }
        out.push(token);
    }
    out
}

fn take_cast_operand(out: &mut Vec<TokenKind>) -> Option<Vec<TokenKind>> {
    let n = out.len();
    if n >= 1 && is_literal(&out[n - 1]) {
        return out.pop().map(|t| vec![t]);
    }
    if n >= 3
        && out[n - 1] == TokenKind::RightParen
        && is_literal(&out[n - 2])
        && out[n - 3] == TokenKind::LeftParen
    {
        let literal = out.drain(n - 3..).nth(1)?;
        return Some(vec![literal]);
    }
    if n >= 4
        && out[n - 1] == TokenKind::RightParen
        && matches!(out[n - 2], TokenKind::Number(_))
        && out[n - 3] == TokenKind::Minus
        && out[n - 4] == TokenKind::LeftParen
    {
        let drained: Vec<TokenKind> = out.drain(n - 4..).collect();
        return Some(drained[1..3].to_vec());
    }
    None
}

fn skip_type_name(iter: &mut std::iter::Peekable<std::vec::IntoIter<TokenKind>>) -> String {
    let first = match iter.peek() {
        Some(TokenKind::Identifier(s)) => s.to_lowercase(),
        Some(TokenKind::QuotedIdentifier(s)) => s.clone(),
        Some(TokenKind::Keyword(kw)) => kw.as_str().to_lowercase(),
        _ => return String::new(),
    };
    iter.next();

    while matches!(iter.peek(), Some(TokenKind::Keyword(kw)) if TYPE_NAME_CONTINUATIONS.contains(kw))
    {
        iter.next();
    }
    if iter.peek() == Some(&TokenKind::LeftParen) {
        let mut depth = 0usize;
        for token in iter.by_ref() {
            match token {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    while iter.peek() == Some(&TokenKind::LeftBracket) {
        iter.next();
        if iter.peek() == Some(&TokenKind::RightBracket) {
            iter.next();
        }
    }
    first
}

fn push_literal(out: &mut Vec<TokenKind>, literal: Vec<TokenKind>, target: &str) {
    if let [TokenKind::String(text)] = literal.as_slice() {
        if NUMERIC_CAST_TARGETS.contains(&target) && is_numeric_text(text) {
            match text.strip_prefix('-') {
                Some(digits) => {
                    out.push(TokenKind::Minus);
                    out.push(TokenKind::Number(digits.to_string()));
                }
                None => out.push(TokenKind::Number(text.clone())),
            }
            return;
        }
    }
    out.extend(literal);
}

fn is_numeric_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit())
}

/// Removes parentheses wrapping the whole expression.
fn strip_outer_parens(tokens: &mut Vec<TokenKind>) {
    while tokens.len() >= 2
        && tokens.first() == Some(&TokenKind::LeftParen)
        && tokens.last() == Some(&TokenKind::RightParen)
        && matching_paren(tokens, 0) == Some(tokens.len() - 1)
    {
        tokens.pop();
        tokens.remove(0);
    }
}

fn matching_paren(tokens: &[TokenKind], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn token_text(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(s) | TokenKind::Operator(s) => s.clone(),
        TokenKind::String(s) => format!("'{}'", s.replace('\'', "''")),
        TokenKind::Identifier(s) => s.to_lowercase(),
        TokenKind::QuotedIdentifier(s) => quote_identifier(s).into_owned(),
        TokenKind::Keyword(kw) => kw.as_str().to_string(),
        TokenKind::Plus => "+".to_string(),
        TokenKind::Minus => "-".to_string(),
        TokenKind::Star => "*".to_string(),
        TokenKind::Slash => "/".to_string(),
        TokenKind::Percent => "%".to_string(),
        TokenKind::Eq => "=".to_string(),
        TokenKind::NotEq => "<>".to_string(),
        TokenKind::Lt => "<".to_string(),
        TokenKind::LtEq => "<=".to_string(),
        TokenKind::Gt => ">".to_string(),
        TokenKind::GtEq => ">=".to_string(),
        TokenKind::Concat => "||".to_string(),
        TokenKind::LeftParen => "(".to_string(),
        TokenKind::RightParen => ")".to_string(),
        TokenKind::LeftBracket => "[".to_string(),
        TokenKind::RightBracket => "]".to_string(),
        TokenKind::Comma => ",".to_string(),
        TokenKind::Semicolon => ";".to_string(),
        TokenKind::Dot => ".".to_string(),
        TokenKind::DoubleColon => "::".to_string(),
        TokenKind::Eof | TokenKind::Error(_) => String::new(),
    }
}

/// A sign is unary when nothing that could be a left operand precedes it.
fn is_unary_position(prev: Option<&TokenKind>) -> bool {
    !matches!(
        prev,
        Some(
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Identifier(_)
                | TokenKind::QuotedIdentifier(_)
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Null | Keyword::End)
        )
    )
}

fn needs_space(prev: &TokenKind, current: &TokenKind) -> bool {
    if matches!(
        current,
        TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::LeftBracket
            | TokenKind::Comma
            | TokenKind::Dot
            | TokenKind::DoubleColon
    ) {
        return false;
    }
    if matches!(
        prev,
        TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::Dot | TokenKind::DoubleColon
    ) {
        return false;
    }
    !(current == &TokenKind::LeftParen
        && matches!(
            prev,
            TokenKind::Identifier(_)
                | TokenKind::QuotedIdentifier(_)
                | TokenKind::Keyword(Keyword::Cast)
        ))
}

fn render(tokens: &[TokenKind]) -> String {
    let mut out = String::new();
    let mut prev: Option<&TokenKind> = None;
    let mut glue_next = false;

    for token in tokens {
        if let Some(p) = prev {
            if !glue_next && needs_space(p, token) {
                out.push(' ');
            }
        }
        out.push_str(&token_text(token));
        glue_next =
            matches!(token, TokenKind::Plus | TokenKind::Minus) && is_unary_position(prev);
        prev = Some(token);
    }
    out
}
