//! Identifier folding and quoting.

use std::borrow::Cow;

use crate::lexer::Keyword;

/// Returns true when `name` can be written without double quotes and still
/// read back as the same identifier.
#[must_use]
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_lowercase() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$') {
        return false;
    }
    !Keyword::from_str(name).is_some_and(|kw| kw.is_reserved())
}

/// Quotes `name` only when it would not survive case folding or collides
/// with a reserved keyword.
#[must_use]
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    if is_plain_identifier(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}
