//! DDL parser implementation.

use super::ast::{
    AlterAction, AlterTable, ColumnDef, CreateIndex, CreateTable, DropIndex, DropTable, Statement,
    TableConstraint, TableConstraintKind,
};
use super::error::ParseError;
use crate::expr::normalize_tokens;
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};
use crate::model::{DataType, Identity, ReferentialAction};

/// Keywords that end a `DEFAULT` expression inside a column definition.
const DEFAULT_TERMINATORS: &[Keyword] = &[
    Keyword::Not,
    Keyword::Null,
    Keyword::Primary,
    Keyword::Unique,
    Keyword::Check,
    Keyword::References,
    Keyword::Constraint,
    Keyword::Generated,
    Keyword::Collate,
    Keyword::Default,
    Keyword::Deferrable,
    Keyword::Initially,
];

/// DDL parser over a pre-tokenized input.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
        }
    }

    /// Parses every `;`-separated statement in the input.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error, positioned at the offending token.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.check(&TokenKind::Semicolon) {
                self.advance();
            }
            if self.current().is_eof() {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.current().is_eof() {
                self.expect(&TokenKind::Semicolon, "';' after statement")?;
            }
        }
        Ok(statements)
    }

    /// Parses a single statement.
    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current().span;
        match self.current().kind.clone() {
            TokenKind::Keyword(Keyword::Create) => {
                self.advance();
                match self.current().kind {
                    TokenKind::Keyword(Keyword::Table) => {
                        self.advance();
                        Ok(Statement::CreateTable(self.parse_create_table(start)?))
                    }
                    TokenKind::Keyword(Keyword::Unique | Keyword::Index) => {
                        let unique = self.consume_keyword(Keyword::Unique);
                        self.expect_keyword(Keyword::Index)?;
                        Ok(Statement::CreateIndex(self.parse_create_index(start, unique)?))
                    }
                    TokenKind::Keyword(Keyword::Temporary | Keyword::Temp) => {
                        Err(self.error_here("temporary tables are not supported"))
                    }
                    _ => Err(self.unsupported_here("CREATE")),
                }
            }
            TokenKind::Keyword(Keyword::Alter) => {
                self.advance();
                if !self.check_keyword(Keyword::Table) {
                    return Err(self.unsupported_here("ALTER"));
                }
                self.advance();
                Ok(Statement::AlterTable(self.parse_alter_table(start)?))
            }
            TokenKind::Keyword(Keyword::Drop) => {
                self.advance();
                match self.current().kind {
                    TokenKind::Keyword(Keyword::Table) => {
                        self.advance();
                        let (names, if_exists) = self.parse_drop_targets(false)?;
                        Ok(Statement::DropTable(DropTable {
                            names,
                            if_exists,
                            span: self.span_from(start),
                        }))
                    }
                    TokenKind::Keyword(Keyword::Index) => {
                        self.advance();
                        let (names, if_exists) = self.parse_drop_targets(true)?;
                        Ok(Statement::DropIndex(DropIndex {
                            names,
                            if_exists,
                            span: self.span_from(start),
                        }))
                    }
                    _ => Err(self.unsupported_here("DROP")),
                }
            }
            TokenKind::Keyword(Keyword::End) => {
                self.advance();
                self.skip_transaction_noise();
                Ok(Statement::Transaction(self.span_from(start)))
            }
            TokenKind::Identifier(word) if is_transaction_word(&word) => {
                self.advance();
                if word.eq_ignore_ascii_case("start") {
                    self.expect_word("transaction")?;
                }
                self.skip_transaction_noise();
                Ok(Statement::Transaction(self.span_from(start)))
            }
            TokenKind::Keyword(
                kw @ (Keyword::Insert | Keyword::Select | Keyword::Update | Keyword::Delete),
            ) => Err(self.error(
                start,
                format!(
                    "{} statements are not supported; only schema DDL is accepted",
                    kw.as_str()
                ),
            )),
            _ => Err(self.unexpected("CREATE, ALTER or DROP")),
        }
    }

    // --- CREATE TABLE ---

    fn parse_create_table(&mut self, start: Span) -> Result<CreateTable, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name("table name")?;
        self.expect(&TokenKind::LeftParen, "'(' after table name")?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                if self.at_table_constraint() {
                    constraints.push(self.parse_table_constraint()?);
                } else if self.check_word("like") || self.check_word("exclude") {
                    return Err(self.unsupported_here("table element"));
                } else {
                    let (column, inline) = self.parse_column_def()?;
                    columns.push(column);
                    constraints.extend(inline);
                }
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "',' or ')' in table definition")?;

        if !self.at_statement_end() {
            return Err(self.error_here(format!(
                "unsupported table option {}",
                self.describe_current()
            )));
        }

        Ok(CreateTable {
            name,
            if_not_exists,
            columns,
            constraints,
            span: self.span_from(start),
        })
    }

    /// Parses a column definition and lifts its inline constraints to
    /// table level.
    fn parse_column_def(&mut self) -> Result<(ColumnDef, Vec<TableConstraint>), ParseError> {
        let start = self.current().span;
        let name = self.expect_identifier("column name")?;
        let data_type = self.parse_data_type()?;

        let mut nullability: Option<bool> = None;
        let mut default = None;
        let mut has_default = false;
        let mut identity = Identity::None;
        let mut constraints = Vec::new();

        loop {
            let constraint_start = self.current().span;
            let constraint_name = if self.consume_keyword(Keyword::Constraint) {
                Some(self.expect_identifier("constraint name")?)
            } else {
                None
            };

            let kind = match self.current().kind {
                TokenKind::Keyword(Keyword::Not) => {
                    self.advance();
                    self.expect_keyword(Keyword::Null)?;
                    self.set_nullability(&mut nullability, false, &name, constraint_start)?;
                    None
                }
                TokenKind::Keyword(Keyword::Null) => {
                    self.advance();
                    self.set_nullability(&mut nullability, true, &name, constraint_start)?;
                    None
                }
                TokenKind::Keyword(Keyword::Default) => {
                    self.advance();
                    if has_default {
                        return Err(self.error(
                            constraint_start,
                            format!("multiple default values specified for column '{name}'"),
                        ));
                    }
                    has_default = true;
                    default = self.parse_default_expression()?;
                    None
                }
                TokenKind::Keyword(Keyword::Primary) => {
                    self.advance();
                    self.expect_keyword(Keyword::Key)?;
                    Some(TableConstraintKind::PrimaryKey {
                        columns: vec![name.clone()],
                    })
                }
                TokenKind::Keyword(Keyword::Unique) => {
                    self.advance();
                    self.reject_nulls_distinct()?;
                    Some(TableConstraintKind::Unique {
                        columns: vec![name.clone()],
                    })
                }
                TokenKind::Keyword(Keyword::Check) => {
                    self.advance();
                    let expression = self.parse_parenthesized_expression()?;
                    Some(TableConstraintKind::Check {
                        expression,
                        column: Some(name.clone()),
                    })
                }
                TokenKind::Keyword(Keyword::References) => {
                    self.advance();
                    Some(self.parse_references(vec![name.clone()])?)
                }
                TokenKind::Keyword(Keyword::Generated) => {
                    self.advance();
                    if identity.is_identity() {
                        return Err(self.error(
                            constraint_start,
                            format!("multiple identity specifications for column '{name}'"),
                        ));
                    }
                    identity = self.parse_identity_clause()?;
                    None
                }
                TokenKind::Keyword(Keyword::Collate) => {
                    return Err(self.error_here("COLLATE is not supported"));
                }
                TokenKind::Keyword(Keyword::Deferrable | Keyword::Initially) => {
                    return Err(self.error_here("deferrable constraints are not supported"));
                }
                _ => {
                    if constraint_name.is_some() {
                        return Err(self.unexpected("a column constraint"));
                    }
                    break;
                }
            };

            if let Some(kind) = kind {
                constraints.push(TableConstraint {
                    name: constraint_name,
                    kind,
                    span: self.span_from(constraint_start),
                });
            }
        }

        let column = ColumnDef {
            name,
            data_type,
            not_null: nullability == Some(false) || identity.is_identity(),
            default,
            identity,
            span: self.span_from(start),
        };
        Ok((column, constraints))
    }

    fn set_nullability(
        &self,
        current: &mut Option<bool>,
        nullable: bool,
        column: &str,
        span: Span,
    ) -> Result<(), ParseError> {
        match *current {
            Some(previous) if previous != nullable => Err(self.error(
                span,
                format!("conflicting NULL/NOT NULL declarations for column '{column}'"),
            )),
            _ => {
                *current = Some(nullable);
                Ok(())
            }
        }
    }

    fn at_table_constraint(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Keyword(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Check
                    | Keyword::Foreign
            )
        )
    }

    /// Parses `[CONSTRAINT name] PRIMARY KEY | UNIQUE | CHECK | FOREIGN KEY ...`.
    fn parse_table_constraint(&mut self) -> Result<TableConstraint, ParseError> {
        let start = self.current().span;
        let name = if self.consume_keyword(Keyword::Constraint) {
            Some(self.expect_identifier("constraint name")?)
        } else {
            None
        };

        let kind = match self.current().kind {
            TokenKind::Keyword(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                TableConstraintKind::PrimaryKey {
                    columns: self.parse_column_list()?,
                }
            }
            TokenKind::Keyword(Keyword::Unique) => {
                self.advance();
                self.reject_nulls_distinct()?;
                TableConstraintKind::Unique {
                    columns: self.parse_column_list()?,
                }
            }
            TokenKind::Keyword(Keyword::Check) => {
                self.advance();
                TableConstraintKind::Check {
                    expression: self.parse_parenthesized_expression()?,
                    column: None,
                }
            }
            TokenKind::Keyword(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_column_list()?;
                self.expect_keyword(Keyword::References)?;
                self.parse_references(columns)?
            }
            _ => return Err(self.unexpected("PRIMARY KEY, UNIQUE, CHECK or FOREIGN KEY")),
        };

        if matches!(
            self.current().kind,
            TokenKind::Keyword(Keyword::Deferrable | Keyword::Initially)
        ) {
            return Err(self.error_here("deferrable constraints are not supported"));
        }
        // NOT VALID only skips checking existing rows.
        if self.check_keyword(Keyword::Not) && self.peek_is_word(1, "valid") {
            self.advance();
            self.advance();
        }

        Ok(TableConstraint {
            name,
            kind,
            span: self.span_from(start),
        })
    }

    /// Parses the part of a foreign key after `REFERENCES`.
    fn parse_references(&mut self, columns: Vec<String>) -> Result<TableConstraintKind, ParseError> {
        let ref_table = self.parse_object_name("referenced table")?;
        let ref_columns = if self.check(&TokenKind::LeftParen) {
            Some(self.parse_column_list()?)
        } else {
            None
        };

        let mut on_delete = ReferentialAction::NoAction;
        let mut on_update = ReferentialAction::NoAction;
        loop {
            if self.check_word("match") {
                self.advance();
                if !self.check_word("simple") {
                    return Err(self.error_here("only MATCH SIMPLE foreign keys are supported"));
                }
                self.advance();
            } else if self.consume_keyword(Keyword::On) {
                if self.consume_keyword(Keyword::Delete) {
                    on_delete = self.parse_referential_action()?;
                } else if self.consume_keyword(Keyword::Update) {
                    on_update = self.parse_referential_action()?;
                } else {
                    return Err(self.unexpected("DELETE or UPDATE"));
                }
            } else {
                break;
            }
        }

        Ok(TableConstraintKind::ForeignKey {
            columns,
            ref_table,
            ref_columns,
            on_delete,
            on_update,
        })
    }

    fn parse_referential_action(&mut self) -> Result<ReferentialAction, ParseError> {
        let action = match self.current().kind {
            TokenKind::Keyword(Keyword::Cascade) => {
                self.advance();
                ReferentialAction::Cascade
            }
            TokenKind::Keyword(Keyword::Restrict) => {
                self.advance();
                ReferentialAction::Restrict
            }
            TokenKind::Keyword(Keyword::No) => {
                self.advance();
                self.expect_keyword(Keyword::Action)?;
                ReferentialAction::NoAction
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                if self.consume_keyword(Keyword::Null) {
                    ReferentialAction::SetNull
                } else if self.consume_keyword(Keyword::Default) {
                    ReferentialAction::SetDefault
                } else {
                    return Err(self.unexpected("NULL or DEFAULT"));
                }
            }
            _ => return Err(self.unexpected("CASCADE, RESTRICT, NO ACTION, SET NULL or SET DEFAULT")),
        };
        if self.check(&TokenKind::LeftParen) {
            return Err(self.error_here("column lists on referential actions are not supported"));
        }
        Ok(action)
    }

    /// Parses `ALWAYS | BY DEFAULT AS IDENTITY` after `GENERATED`.
    fn parse_identity_clause(&mut self) -> Result<Identity, ParseError> {
        let identity = self.parse_identity_generation()?;
        self.expect_keyword(Keyword::As)?;
        if self.check(&TokenKind::LeftParen) {
            return Err(self.error_here("generated columns are not supported"));
        }
        self.expect_keyword(Keyword::Identity)?;
        if self.check(&TokenKind::LeftParen) {
            return Err(self.error_here("identity sequence options are not supported"));
        }
        Ok(identity)
    }

    fn parse_identity_generation(&mut self) -> Result<Identity, ParseError> {
        if self.consume_keyword(Keyword::Always) {
            Ok(Identity::Always)
        } else if self.consume_keyword(Keyword::By) {
            self.expect_keyword(Keyword::Default)?;
            Ok(Identity::ByDefault)
        } else {
            Err(self.unexpected("ALWAYS or BY DEFAULT"))
        }
    }

    fn reject_nulls_distinct(&self) -> Result<(), ParseError> {
        if self.check_keyword(Keyword::Nulls) {
            return Err(self.error_here("NULLS [NOT] DISTINCT is not supported"));
        }
        Ok(())
    }

    // --- Types ---

    /// Parses a data type, folding multi-word names and resolving aliases.
    fn parse_data_type(&mut self) -> Result<DataType, ParseError> {
        let start = self.current().span;
        let mut name = match self.current().kind.clone() {
            TokenKind::Identifier(word) => {
                self.advance();
                word.to_lowercase()
            }
            TokenKind::QuotedIdentifier(word) => {
                self.advance();
                self.reject_array_suffix()?;
                return Ok(DataType::Custom { name: word });
            }
            TokenKind::Keyword(Keyword::Double) => {
                self.advance();
                self.expect_keyword(Keyword::Precision)?;
                "double precision".to_string()
            }
            TokenKind::Keyword(Keyword::Time) => {
                self.advance();
                "time".to_string()
            }
            _ => return Err(self.unexpected("a data type")),
        };

        if self.check(&TokenKind::Dot) && (name == "public" || name == "pg_catalog") {
            self.advance();
            name = self.expect_identifier("type name")?;
        }
        if (name == "character" || name == "char") && self.consume_keyword(Keyword::Varying) {
            name = "character varying".to_string();
        }

        let modifiers = if self.check(&TokenKind::LeftParen) {
            self.parse_type_modifiers()?
        } else {
            Vec::new()
        };

        if name == "time" || name == "timestamp" {
            if self.consume_keyword(Keyword::With) {
                self.expect_keyword(Keyword::Time)?;
                self.expect_keyword(Keyword::Zone)?;
                name.push_str(" with time zone");
            } else if self.consume_keyword(Keyword::Without) {
                self.expect_keyword(Keyword::Time)?;
                self.expect_keyword(Keyword::Zone)?;
                name.push_str(" without time zone");
            }
        }

        self.reject_array_suffix()?;
        DataType::resolve(&name, &modifiers).map_err(|reason| self.error(self.span_from(start), reason))
    }

    fn parse_type_modifiers(&mut self) -> Result<Vec<u32>, ParseError> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let mut modifiers = Vec::new();
        loop {
            match self.current().kind.clone() {
                TokenKind::Number(text) => {
                    let value = text
                        .parse::<u32>()
                        .map_err(|_| self.error_here(format!("invalid type modifier {text}")))?;
                    self.advance();
                    modifiers.push(value);
                }
                _ => return Err(self.unexpected("an integer type modifier")),
            }
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "')' after type modifiers")?;
        Ok(modifiers)
    }

    fn reject_array_suffix(&self) -> Result<(), ParseError> {
        if self.check(&TokenKind::LeftBracket) || self.check_keyword(Keyword::Array) {
            return Err(self.error_here("array types are not supported"));
        }
        Ok(())
    }

    // --- Expressions ---

    /// Captures a `DEFAULT` expression up to the next column constraint,
    /// comma or closing parenthesis. `DEFAULT NULL` yields `None`.
    fn parse_default_expression(&mut self) -> Result<Option<String>, ParseError> {
        let first = self.pos;
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof | TokenKind::Semicolon => break,
                TokenKind::Error(reason) => return Err(self.error(token.span, reason.clone())),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth == 0 => break,
                TokenKind::RightParen => depth -= 1,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::Keyword(kw)
                    if depth == 0 && self.pos > first && DEFAULT_TERMINATORS.contains(kw) =>
                {
                    break;
                }
                _ => {}
            }
            self.advance();
        }

        if depth != 0 {
            return Err(self.error_here("unbalanced parentheses in default expression"));
        }
        if self.pos == first {
            return Err(self.unexpected("an expression after DEFAULT"));
        }
        let text = normalize_tokens(&self.tokens[first..self.pos]);
        Ok((text != "NULL").then_some(text))
    }

    /// Captures `( expr )` and returns the normalized inner expression.
    fn parse_parenthesized_expression(&mut self) -> Result<String, ParseError> {
        self.expect(&TokenKind::LeftParen, "'(' before expression")?;
        let first = self.pos;
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof => return Err(self.unexpected("')' to close expression")),
                TokenKind::Error(reason) => return Err(self.error(token.span, reason.clone())),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth == 0 => break,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        if self.pos == first {
            return Err(self.unexpected("an expression"));
        }
        let text = normalize_tokens(&self.tokens[first..self.pos]);
        self.advance();
        Ok(text)
    }

    /// Skips a `USING` conversion expression; it does not affect the schema.
    fn skip_using_expression(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof | TokenKind::Semicolon => break,
                TokenKind::Error(reason) => return Err(self.error(token.span, reason.clone())),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth = depth.saturating_sub(1),
                TokenKind::Comma if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    // --- CREATE INDEX ---

    fn parse_create_index(&mut self, start: Span, unique: bool) -> Result<CreateIndex, ParseError> {
        self.consume_keyword(Keyword::Concurrently);
        let if_not_exists = self.parse_if_not_exists()?;
        let name = if self.check_keyword(Keyword::On) {
            None
        } else {
            Some(self.expect_identifier("index name")?)
        };
        self.expect_keyword(Keyword::On)?;
        self.consume_keyword(Keyword::Only);
        let table = self.parse_object_name("table name")?;

        if self.consume_keyword(Keyword::Using) {
            let method_span = self.current().span;
            let method = self.expect_identifier("index method")?;
            if method != "btree" {
                return Err(self.error(
                    method_span,
                    format!("index method '{method}' is not supported"),
                ));
            }
        }

        self.expect(&TokenKind::LeftParen, "'(' before index columns")?;
        let mut columns = Vec::new();
        loop {
            if self.check(&TokenKind::LeftParen) {
                return Err(self.error_here("expression indexes are not supported"));
            }
            columns.push(self.expect_identifier("index column")?);
            if self.check(&TokenKind::LeftParen) || self.check(&TokenKind::DoubleColon) {
                return Err(self.error_here("expression indexes are not supported"));
            }
            self.consume_keyword(Keyword::Asc);
            if self.check_keyword(Keyword::Desc) || self.check_keyword(Keyword::Nulls) {
                return Err(self.error_here("index column ordering options are not supported"));
            }
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "',' or ')' in index column list")?;

        if self.check_keyword(Keyword::Where) {
            return Err(self.error_here("partial indexes are not supported"));
        }
        if !self.at_statement_end() {
            return Err(self.error_here(format!(
                "unsupported index option {}",
                self.describe_current()
            )));
        }

        Ok(CreateIndex {
            name,
            unique,
            if_not_exists,
            table,
            columns,
            span: self.span_from(start),
        })
    }

    // --- ALTER TABLE ---

    fn parse_alter_table(&mut self, start: Span) -> Result<AlterTable, ParseError> {
        let if_exists = self.parse_if_exists()?;
        self.consume_keyword(Keyword::Only);
        let table = self.parse_object_name("table name")?;

        let mut actions = Vec::new();
        loop {
            actions.push(self.parse_alter_action()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        Ok(AlterTable {
            table,
            if_exists,
            actions,
            span: self.span_from(start),
        })
    }

    fn parse_alter_action(&mut self) -> Result<AlterAction, ParseError> {
        match self.current().kind {
            TokenKind::Keyword(Keyword::Add) => {
                self.advance();
                if self.at_table_constraint() {
                    return Ok(AlterAction::AddConstraint(self.parse_table_constraint()?));
                }
                self.consume_keyword(Keyword::Column);
                let if_not_exists = self.parse_if_not_exists()?;
                let (column, constraints) = self.parse_column_def()?;
                Ok(AlterAction::AddColumn {
                    column,
                    constraints,
                    if_not_exists,
                })
            }
            TokenKind::Keyword(Keyword::Drop) => {
                self.advance();
                if self.consume_keyword(Keyword::Constraint) {
                    let if_exists = self.parse_if_exists()?;
                    let name = self.expect_identifier("constraint name")?;
                    self.parse_drop_behavior()?;
                    return Ok(AlterAction::DropConstraint { name, if_exists });
                }
                self.consume_keyword(Keyword::Column);
                let if_exists = self.parse_if_exists()?;
                let name = self.expect_identifier("column name")?;
                self.parse_drop_behavior()?;
                Ok(AlterAction::DropColumn { name, if_exists })
            }
            TokenKind::Keyword(Keyword::Alter) => {
                self.advance();
                self.consume_keyword(Keyword::Column);
                let column = self.expect_identifier("column name")?;
                self.parse_alter_column(column)
            }
            _ if self.check_word("rename") => Err(self.error_here(
                "RENAME is not supported; renames are expressed as a drop and an add",
            )),
            _ => Err(self.unexpected("ADD, DROP or ALTER")),
        }
    }

    fn parse_alter_column(&mut self, column: String) -> Result<AlterAction, ParseError> {
        match self.current().kind {
            TokenKind::Keyword(Keyword::Type) => {
                self.advance();
                self.parse_alter_column_type(column)
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                match self.current().kind {
                    TokenKind::Keyword(Keyword::Not) => {
                        self.advance();
                        self.expect_keyword(Keyword::Null)?;
                        Ok(AlterAction::SetNotNull { column })
                    }
                    TokenKind::Keyword(Keyword::Default) => {
                        self.advance();
                        let expression = self.parse_default_expression()?;
                        Ok(AlterAction::SetDefault { column, expression })
                    }
                    TokenKind::Keyword(Keyword::Generated) => {
                        self.advance();
                        let identity = self.parse_identity_generation()?;
                        Ok(AlterAction::SetIdentity { column, identity })
                    }
                    _ if self.check_word("data") => {
                        self.advance();
                        self.expect_keyword(Keyword::Type)?;
                        self.parse_alter_column_type(column)
                    }
                    _ => Err(self.unexpected("NOT NULL, DEFAULT, GENERATED or DATA TYPE")),
                }
            }
            TokenKind::Keyword(Keyword::Drop) => {
                self.advance();
                match self.current().kind {
                    TokenKind::Keyword(Keyword::Not) => {
                        self.advance();
                        self.expect_keyword(Keyword::Null)?;
                        Ok(AlterAction::DropNotNull { column })
                    }
                    TokenKind::Keyword(Keyword::Default) => {
                        self.advance();
                        Ok(AlterAction::DropDefault { column })
                    }
                    TokenKind::Keyword(Keyword::Identity) => {
                        self.advance();
                        let if_exists = self.parse_if_exists()?;
                        Ok(AlterAction::DropIdentity { column, if_exists })
                    }
                    _ => Err(self.unexpected("NOT NULL, DEFAULT or IDENTITY")),
                }
            }
            TokenKind::Keyword(Keyword::Add) => {
                self.advance();
                self.expect_keyword(Keyword::Generated)?;
                let identity = self.parse_identity_clause()?;
                Ok(AlterAction::AddIdentity { column, identity })
            }
            _ => Err(self.unexpected("TYPE, SET, DROP or ADD")),
        }
    }

    fn parse_alter_column_type(&mut self, column: String) -> Result<AlterAction, ParseError> {
        let data_type = self.parse_data_type()?;
        if self.check_keyword(Keyword::Collate) {
            return Err(self.error_here("COLLATE is not supported"));
        }
        if self.consume_keyword(Keyword::Using) {
            self.skip_using_expression()?;
        }
        Ok(AlterAction::AlterColumnType { column, data_type })
    }

    // --- DROP ---

    fn parse_drop_targets(&mut self, index: bool) -> Result<(Vec<String>, bool), ParseError> {
        if index {
            self.consume_keyword(Keyword::Concurrently);
        }
        let if_exists = self.parse_if_exists()?;
        let what = if index { "index name" } else { "table name" };
        let mut names = vec![self.parse_object_name(what)?];
        while self.consume(&TokenKind::Comma) {
            names.push(self.parse_object_name(what)?);
        }
        self.parse_drop_behavior()?;
        Ok((names, if_exists))
    }

    fn parse_drop_behavior(&mut self) -> Result<(), ParseError> {
        if self.check_keyword(Keyword::Cascade) {
            return Err(self.error_here(
                "CASCADE is not supported; drop dependent objects explicitly",
            ));
        }
        self.consume_keyword(Keyword::Restrict);
        Ok(())
    }

    // --- Names and lists ---

    /// Parses a possibly `public.`-qualified object name.
    fn parse_object_name(&mut self, what: &str) -> Result<String, ParseError> {
        let start = self.current().span;
        let first = self.expect_identifier(what)?;
        if !self.check(&TokenKind::Dot) {
            return Ok(first);
        }
        self.advance();
        if first != "public" {
            return Err(self.error(
                start,
                format!("schema '{first}' is not supported; only public objects are managed"),
            ));
        }
        self.expect_identifier(what)
    }

    /// Parses `( col, col, ... )`.
    fn parse_column_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LeftParen, "'(' before column list")?;
        let mut columns = vec![self.expect_identifier("column name")?];
        while self.consume(&TokenKind::Comma) {
            columns.push(self.expect_identifier("column name")?);
        }
        self.expect(&TokenKind::RightParen, "',' or ')' in column list")?;
        Ok(columns)
    }

    fn parse_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if !self.consume_keyword(Keyword::If) {
            return Ok(false);
        }
        self.expect_keyword(Keyword::Not)?;
        self.expect_keyword(Keyword::Exists)?;
        Ok(true)
    }

    fn parse_if_exists(&mut self) -> Result<bool, ParseError> {
        if !self.consume_keyword(Keyword::If) {
            return Ok(false);
        }
        self.expect_keyword(Keyword::Exists)?;
        Ok(true)
    }

    fn skip_transaction_noise(&mut self) {
        while self.check_word("transaction") || self.check_word("work") {
            self.advance();
        }
    }

    // --- Helper methods ---

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// Advances to the next token; stays on `Eof`.
    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        let end = if self.pos == 0 {
            start.end
        } else {
            self.tokens[self.pos - 1].span.end
        };
        Span::new(start.start, end.max(start.start))
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Checks if the current token is the unquoted word `word`.
    fn check_word(&self, word: &str) -> bool {
        self.peek_is_word(0, word)
    }

    fn peek_is_word(&self, n: usize, word: &str) -> bool {
        matches!(&self.peek(n).kind, TokenKind::Identifier(s) if s.eq_ignore_ascii_case(word))
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Semicolon | TokenKind::Eof)
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&word.to_ascii_uppercase()))
        }
    }

    /// Expects and returns an identifier, folding unquoted names to lower
    /// case. Non-reserved keywords are accepted as names.
    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        let name = match &self.current().kind {
            TokenKind::Identifier(name) => name.to_lowercase(),
            TokenKind::QuotedIdentifier(name) => name.clone(),
            TokenKind::Keyword(kw) if !kw.is_reserved() => kw.as_str().to_lowercase(),
            _ => return Err(self.unexpected(what)),
        };
        self.advance();
        Ok(name)
    }

    fn error(&self, span: Span, reason: impl Into<String>) -> ParseError {
        ParseError::at(self.source, span, reason)
    }

    fn error_here(&self, reason: impl Into<String>) -> ParseError {
        self.error(self.current().span, reason)
    }

    fn unsupported_here(&self, context: &str) -> ParseError {
        self.error_here(format!(
            "{context} {} is not supported",
            self.describe_current()
        ))
    }

    fn describe_current(&self) -> String {
        let token = self.current();
        match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.span.slice(self.source)),
        }
    }

    /// Builds an "expected X, found Y" error at the current token. Lexer
    /// errors are reported with their own message.
    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        match &token.kind {
            TokenKind::Error(reason) => self.error(token.span, reason.clone()),
            TokenKind::Eof => self.error(
                token.span,
                format!("unexpected end of input: expected {expected}"),
            ),
            _ => self.error(
                token.span,
                format!("expected {expected}, found {}", self.describe_current()),
            ),
        }
    }
}

fn is_transaction_word(word: &str) -> bool {
    ["begin", "commit", "start"]
        .iter()
        .any(|w| word.eq_ignore_ascii_case(w))
}
