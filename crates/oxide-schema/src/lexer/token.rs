//! Token types for the DDL lexer.

use super::Span;

/// Keywords recognised by the DDL lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Statements
    Create,
    Drop,
    Alter,
    Table,
    Index,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Temporary,
    Temp,
    Concurrently,
    Only,

    // Constraints
    Constraint,
    Primary,
    Key,
    Foreign,
    References,
    Unique,
    Check,
    Default,
    Not,
    Null,
    Deferrable,
    Initially,
    Collate,

    // Referential actions
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Set,
    No,
    Action,

    // Identity and generated columns
    Generated,
    Always,
    By,
    As,
    Identity,
    Stored,

    // ALTER TABLE
    Add,
    Column,
    Type,
    Using,
    If,
    Exists,

    // Type modifiers
    Double,
    Precision,
    Varying,
    With,
    Without,
    Time,
    Zone,
    Array,

    // Expressions
    True,
    False,
    And,
    Or,
    Is,
    In,
    Like,
    Between,
    Any,
    All,
    Cast,
    Case,
    When,
    Then,
    Else,
    End,

    // Ordering
    Asc,
    Desc,
    Nulls,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Some(Self::Create),
            "DROP" => Some(Self::Drop),
            "ALTER" => Some(Self::Alter),
            "TABLE" => Some(Self::Table),
            "INDEX" => Some(Self::Index),
            "INSERT" => Some(Self::Insert),
            "INTO" => Some(Self::Into),
            "VALUES" => Some(Self::Values),
            "SELECT" => Some(Self::Select),
            "FROM" => Some(Self::From),
            "WHERE" => Some(Self::Where),
            "TEMPORARY" => Some(Self::Temporary),
            "TEMP" => Some(Self::Temp),
            "CONCURRENTLY" => Some(Self::Concurrently),
            "ONLY" => Some(Self::Only),
            "CONSTRAINT" => Some(Self::Constraint),
            "PRIMARY" => Some(Self::Primary),
            "KEY" => Some(Self::Key),
            "FOREIGN" => Some(Self::Foreign),
            "REFERENCES" => Some(Self::References),
            "UNIQUE" => Some(Self::Unique),
            "CHECK" => Some(Self::Check),
            "DEFAULT" => Some(Self::Default),
            "NOT" => Some(Self::Not),
            "NULL" => Some(Self::Null),
            "DEFERRABLE" => Some(Self::Deferrable),
            "INITIALLY" => Some(Self::Initially),
            "COLLATE" => Some(Self::Collate),
            "ON" => Some(Self::On),
            "DELETE" => Some(Self::Delete),
            "UPDATE" => Some(Self::Update),
            "CASCADE" => Some(Self::Cascade),
            "RESTRICT" => Some(Self::Restrict),
            "SET" => Some(Self::Set),
            "NO" => Some(Self::No),
            "ACTION" => Some(Self::Action),
            "GENERATED" => Some(Self::Generated),
            "ALWAYS" => Some(Self::Always),
            "BY" => Some(Self::By),
            "AS" => Some(Self::As),
            "IDENTITY" => Some(Self::Identity),
            "STORED" => Some(Self::Stored),
            "ADD" => Some(Self::Add),
            "COLUMN" => Some(Self::Column),
            "TYPE" => Some(Self::Type),
            "USING" => Some(Self::Using),
            "IF" => Some(Self::If),
            "EXISTS" => Some(Self::Exists),
            "DOUBLE" => Some(Self::Double),
            "PRECISION" => Some(Self::Precision),
            "VARYING" => Some(Self::Varying),
            "WITH" => Some(Self::With),
            "WITHOUT" => Some(Self::Without),
            "TIME" => Some(Self::Time),
            "ZONE" => Some(Self::Zone),
            "ARRAY" => Some(Self::Array),
            "TRUE" => Some(Self::True),
            "FALSE" => Some(Self::False),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "IS" => Some(Self::Is),
            "IN" => Some(Self::In),
            "LIKE" => Some(Self::Like),
            "BETWEEN" => Some(Self::Between),
            "ANY" => Some(Self::Any),
            "ALL" => Some(Self::All),
            "CAST" => Some(Self::Cast),
            "CASE" => Some(Self::Case),
            "WHEN" => Some(Self::When),
            "THEN" => Some(Self::Then),
            "ELSE" => Some(Self::Else),
            "END" => Some(Self::End),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "NULLS" => Some(Self::Nulls),
            _ => None,
        }
    }

    /// Returns the keyword as an upper-case string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Table => "TABLE",
            Self::Index => "INDEX",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Temporary => "TEMPORARY",
            Self::Temp => "TEMP",
            Self::Concurrently => "CONCURRENTLY",
            Self::Only => "ONLY",
            Self::Constraint => "CONSTRAINT",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::Foreign => "FOREIGN",
            Self::References => "REFERENCES",
            Self::Unique => "UNIQUE",
            Self::Check => "CHECK",
            Self::Default => "DEFAULT",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Deferrable => "DEFERRABLE",
            Self::Initially => "INITIALLY",
            Self::Collate => "COLLATE",
            Self::On => "ON",
            Self::Delete => "DELETE",
            Self::Update => "UPDATE",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::Set => "SET",
            Self::No => "NO",
            Self::Action => "ACTION",
            Self::Generated => "GENERATED",
            Self::Always => "ALWAYS",
            Self::By => "BY",
            Self::As => "AS",
            Self::Identity => "IDENTITY",
            Self::Stored => "STORED",
            Self::Add => "ADD",
            Self::Column => "COLUMN",
            Self::Type => "TYPE",
            Self::Using => "USING",
            Self::If => "IF",
            Self::Exists => "EXISTS",
            Self::Double => "DOUBLE",
            Self::Precision => "PRECISION",
            Self::Varying => "VARYING",
            Self::With => "WITH",
            Self::Without => "WITHOUT",
            Self::Time => "TIME",
            Self::Zone => "ZONE",
            Self::Array => "ARRAY",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Is => "IS",
            Self::In => "IN",
            Self::Like => "LIKE",
            Self::Between => "BETWEEN",
            Self::Any => "ANY",
            Self::All => "ALL",
            Self::Cast => "CAST",
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Nulls => "NULLS",
        }
    }

    /// Returns true for keywords PostgreSQL reserves, which cannot be used
    /// as bare column or table names.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(
            self,
            Self::All
                | Self::And
                | Self::Any
                | Self::Array
                | Self::As
                | Self::Asc
                | Self::Case
                | Self::Cast
                | Self::Check
                | Self::Collate
                | Self::Column
                | Self::Constraint
                | Self::Create
                | Self::Default
                | Self::Deferrable
                | Self::Desc
                | Self::Else
                | Self::End
                | Self::False
                | Self::Foreign
                | Self::From
                | Self::In
                | Self::Initially
                | Self::Into
                | Self::Is
                | Self::Not
                | Self::Null
                | Self::On
                | Self::Only
                | Self::Or
                | Self::Primary
                | Self::References
                | Self::Select
                | Self::Table
                | Self::Then
                | Self::True
                | Self::Unique
                | Self::Using
                | Self::When
                | Self::Where
                | Self::With
        )
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal, kept as written (e.g., 42, 3.14, 1e10)
    Number(String),
    /// String literal with quotes removed and escapes resolved (e.g., 'it''s')
    String(String),

    // Identifiers and keywords
    /// Unquoted identifier as written; the parser folds it to lower case
    Identifier(String),
    /// Double-quoted identifier, case preserved
    QuotedIdentifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,
    /// ~ and other operator symbols PostgreSQL allows (e.g., ~*, @>)
    Operator(String),

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// ::
    DoubleColon,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}
