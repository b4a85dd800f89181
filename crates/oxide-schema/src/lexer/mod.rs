//! DDL lexer.
//!
//! A hand-written lexer for the PostgreSQL DDL subset the parser understands.
//! Unquoted identifiers keep their original spelling; case folding happens in
//! the parser so that error messages can quote the input verbatim.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
