//! Abstract syntax tree for the supported CQL statements.

use crate::span::{Span, Spanned};
use cqlmap_proto::ColumnType;

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `USE keyspace`
    Use(Spanned<String>),
    /// `CREATE KEYSPACE [IF NOT EXISTS] name WITH ...`; options are ignored.
    CreateKeyspace {
        name: Spanned<String>,
        if_not_exists: bool,
    },
    /// `CREATE TABLE`
    CreateTable(CreateTable),
    /// `DROP TABLE [IF EXISTS] t`
    DropTable { table: TableName, if_exists: bool },
    /// `INSERT INTO`
    Insert(Insert),
    /// `UPDATE`
    Update(Update),
    /// `DELETE FROM`
    Delete(Delete),
    /// `SELECT`
    Select(Select),
    /// `TRUNCATE [TABLE] t`
    Truncate { table: TableName },
}

impl Statement {
    /// Short upper-case name of the statement kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Use(_) => "USE",
            Statement::CreateKeyspace { .. } => "CREATE KEYSPACE",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::DropTable { .. } => "DROP TABLE",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Select(_) => "SELECT",
            Statement::Truncate { .. } => "TRUNCATE",
        }
    }
}

/// Optionally keyspace-qualified table name.
#[derive(Debug, Clone, PartialEq)]
pub struct TableName {
    pub keyspace: Option<String>,
    pub name: String,
    pub span: Span,
}

/// One column definition in `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: TableName,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    /// Partition and clustering columns, flattened in declaration order.
    pub primary_key: Vec<Spanned<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: TableName,
    pub columns: Vec<Spanned<String>>,
    pub values: Vec<Spanned<Term>>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableName,
    pub assignments: Vec<(Spanned<String>, Spanned<Term>)>,
    pub relations: Vec<Relation>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableName,
    pub relations: Vec<Relation>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: TableName,
    pub selection: Selection,
    pub relations: Vec<Relation>,
    pub limit: Option<Spanned<u64>>,
    pub allow_filtering: bool,
}

/// What a `SELECT` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// `*`
    All,
    /// `COUNT(*)`
    Count,
    /// Explicit column list.
    Columns(Vec<Spanned<String>>),
}

/// A `WHERE` condition; conditions are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub column: Spanned<String>,
    pub op: RelationOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationOp {
    /// `col = term`
    Eq(Spanned<Term>),
    /// `col IN (term, ...)`
    In(Vec<Spanned<Term>>),
}

/// A literal, bind marker or collection literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Null,
    Bool(bool),
    Int(i64),
    /// Float text as written.
    Float(String),
    Text(String),
    Uuid([u8; 16]),
    Blob(Vec<u8>),
    /// `?`, numbered from zero in order of appearance.
    Marker(usize),
    List(Vec<Spanned<Term>>),
    /// `{a, b}`; `{}` parses as an empty set.
    Set(Vec<Spanned<Term>>),
    Map(Vec<(Spanned<Term>, Spanned<Term>)>),
}
