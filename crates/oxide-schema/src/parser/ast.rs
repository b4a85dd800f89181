//! Statement syntax tree produced by the parser.
//!
//! Names are already case-folded and types already resolved; spans are kept
//! so that errors found while building the model can point at the source.

use crate::lexer::Span;
use crate::model::{DataType, Identity, ReferentialAction};

/// A parsed DDL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    AlterTable(AlterTable),
    DropTable(DropTable),
    DropIndex(DropIndex),
    /// `BEGIN` / `COMMIT`, accepted so wrapped migration files replay cleanly.
    Transaction(Span),
}

impl Statement {
    /// Returns the source range of the whole statement.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::CreateTable(s) => s.span,
            Self::CreateIndex(s) => s.span,
            Self::AlterTable(s) => s.span,
            Self::DropTable(s) => s.span,
            Self::DropIndex(s) => s.span,
            Self::Transaction(span) => *span,
        }
    }
}

/// `CREATE TABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    /// Table-level constraints plus column-level ones lifted to table level.
    pub constraints: Vec<TableConstraint>,
    pub span: Span,
}

/// A column definition inside `CREATE TABLE` or `ADD COLUMN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub not_null: bool,
    /// Normalized default expression. `DEFAULT NULL` is stored as `None`.
    pub default: Option<String>,
    pub identity: Identity,
    pub span: Span,
}

/// A constraint as written, before default naming and key resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub kind: TableConstraintKind,
    pub span: Span,
}

impl TableConstraint {
    /// Returns true for foreign keys, which are attached after every table
    /// they may reference exists.
    #[must_use]
    pub const fn is_foreign_key(&self) -> bool {
        matches!(self.kind, TableConstraintKind::ForeignKey { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableConstraintKind {
    PrimaryKey {
        columns: Vec<String>,
    },
    Unique {
        columns: Vec<String>,
    },
    /// `column` is set for column-level checks and only affects naming.
    Check {
        expression: String,
        column: Option<String>,
    },
    /// `ref_columns` is `None` for `REFERENCES t` without a column list.
    ForeignKey {
        columns: Vec<String>,
        ref_table: String,
        ref_columns: Option<Vec<String>>,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    },
}

/// `CREATE [UNIQUE] INDEX`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndex {
    pub name: Option<String>,
    pub unique: bool,
    pub if_not_exists: bool,
    pub table: String,
    pub columns: Vec<String>,
    pub span: Span,
}

/// `ALTER TABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    pub table: String,
    pub if_exists: bool,
    pub actions: Vec<AlterAction>,
    pub span: Span,
}

/// One comma-separated action of an `ALTER TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddColumn {
        column: ColumnDef,
        constraints: Vec<TableConstraint>,
        if_not_exists: bool,
    },
    DropColumn {
        name: String,
        if_exists: bool,
    },
    AlterColumnType {
        column: String,
        data_type: DataType,
    },
    SetNotNull {
        column: String,
    },
    DropNotNull {
        column: String,
    },
    SetDefault {
        column: String,
        expression: Option<String>,
    },
    DropDefault {
        column: String,
    },
    AddIdentity {
        column: String,
        identity: Identity,
    },
    SetIdentity {
        column: String,
        identity: Identity,
    },
    DropIdentity {
        column: String,
        if_exists: bool,
    },
    AddConstraint(TableConstraint),
    DropConstraint {
        name: String,
        if_exists: bool,
    },
}

/// `DROP TABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub names: Vec<String>,
    pub if_exists: bool,
    pub span: Span,
}

/// `DROP INDEX`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndex {
    pub names: Vec<String>,
    pub if_exists: bool,
    pub span: Span,
}
