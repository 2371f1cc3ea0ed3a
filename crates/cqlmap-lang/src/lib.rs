//! CQL subset parser.
//!
//! Parses the statements the in-memory driver executes. Unquoted identifiers
//! fold to lower case and keywords are case-insensitive, as in CQL.
//!
//! # Statements
//!
//! ```text
//! USE ks
//! CREATE KEYSPACE [IF NOT EXISTS] ks WITH replication = {...}
//! CREATE TABLE [IF NOT EXISTS] [ks.]t (col type [PRIMARY KEY], ..., [PRIMARY KEY ((a, b), c)])
//! DROP TABLE [IF EXISTS] t
//! INSERT INTO t (a, b) VALUES (1, ?) [IF NOT EXISTS]
//! UPDATE t SET a = 1 WHERE k = 2 [IF EXISTS]
//! DELETE FROM t WHERE k = 2 [IF EXISTS]
//! SELECT * | COUNT(*) | a, b FROM t [WHERE k = 1 AND c IN (1, 2)] [LIMIT n] [ALLOW FILTERING]
//! TRUNCATE [TABLE] t
//! ```
//!
//! # Usage
//!
//! ```rust
//! use cqlmap_lang::{count_markers, parse, Statement};
//!
//! let stmt = parse("select value from test_data where docid = ?").unwrap();
//! assert!(matches!(stmt, Statement::Select(_)));
//! assert_eq!(count_markers("insert into t (a, b) values (?, ?)").unwrap(), 2);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::{
    ColumnDef, CreateTable, Delete, Insert, Relation, RelationOp, Select, Selection, Statement,
    TableName, Term, Update,
};
pub use error::ParseError;
pub use span::{Span, Spanned};

/// Parse a source string into a statement.
pub fn parse(source: &str) -> Result<Statement, ParseError> {
    parser::parse(source)
}

/// Count the `?` bind markers in a statement without parsing it.
///
/// Markers inside text literals are not counted.
pub fn count_markers(source: &str) -> Result<usize, ParseError> {
    let mut lexer = lexer::Lexer::new(source);
    let mut count = 0;
    while let Some(tok) = lexer.next_token() {
        if tok.token == lexer::Token::Marker {
            count += 1;
        }
    }
    match lexer.invalid() {
        Some(span) => Err(ParseError::new("unrecognized input", span)),
        None => Ok(count),
    }
}

/// Tokenize a source string (for debugging/testing).
pub fn tokenize(source: &str) -> Vec<lexer::SpannedToken> {
    lexer::tokenize(source)
}
