//! Recursive descent parser for the supported CQL statements.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Lexer, SpannedToken, Token};
use crate::span::{Span, Spanned};
use cqlmap_proto::ColumnType;

/// Parser for one CQL statement.
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    source: &'source str,
    markers: usize,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source.
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: Lexer::new(source),
            source,
            markers: 0,
        }
    }

    /// Number of `?` markers consumed so far.
    pub fn marker_count(&self) -> usize {
        self.markers
    }

    /// Parse a complete statement, optionally terminated by `;`.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let head = self.next_token()?;
        let stmt = match &head.token {
            t if t.is_keyword("use") => Statement::Use(self.expect_ident()?),
            t if t.is_keyword("create") => self.parse_create()?,
            t if t.is_keyword("drop") => self.parse_drop()?,
            t if t.is_keyword("insert") => self.parse_insert()?,
            t if t.is_keyword("update") => self.parse_update()?,
            t if t.is_keyword("delete") => self.parse_delete()?,
            t if t.is_keyword("select") => self.parse_select()?,
            t if t.is_keyword("truncate") => self.parse_truncate()?,
            other => {
                return Err(ParseError::new(
                    format!("expected a statement, found {:?}", other),
                    head.span,
                )
                .with_hint(
                    "supported: USE, CREATE, DROP, INSERT, UPDATE, DELETE, SELECT, TRUNCATE",
                ))
            }
        };

        self.eat(&Token::Semicolon)?;
        if let Some(tok) = self.lexer.peek() {
            return Err(ParseError::new(
                format!("unexpected trailing input {:?}", tok.token),
                tok.span,
            ));
        }
        if let Some(span) = self.lexer.invalid() {
            return Err(ParseError::new("unrecognized input", span));
        }
        Ok(stmt)
    }

    fn parse_create(&mut self) -> Result<Statement, ParseError> {
        if self.eat_keyword("keyspace")? {
            let if_not_exists = self.parse_if_not_exists()?;
            let name = self.expect_ident()?;
            // replication options are accepted and ignored
            self.skip_to_end();
            return Ok(Statement::CreateKeyspace {
                name,
                if_not_exists,
            });
        }
        self.expect_keyword("table")?;
        self.parse_create_table()
    }

    fn parse_create_table(&mut self) -> Result<Statement, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let table = self.parse_table_name()?;
        self.expect_token(Token::LParen)?;

        let mut columns = Vec::new();
        let mut primary_key: Vec<Spanned<String>> = Vec::new();
        loop {
            if self.peek_keyword("primary") {
                let start = self.next_token()?.span;
                self.expect_keyword("key")?;
                if !primary_key.is_empty() {
                    return Err(ParseError::new("multiple primary key definitions", start));
                }
                self.expect_token(Token::LParen)?;
                if self.eat(&Token::LParen)? {
                    primary_key.extend(self.parse_ident_list()?);
                    self.expect_token(Token::RParen)?;
                } else {
                    primary_key.push(self.expect_ident()?);
                }
                while self.eat(&Token::Comma)? {
                    primary_key.push(self.expect_ident()?);
                }
                self.expect_token(Token::RParen)?;
            } else {
                let name = self.expect_ident()?;
                let column_type = self.parse_type()?;
                if self.eat_keyword("primary")? {
                    self.expect_keyword("key")?;
                    if !primary_key.is_empty() {
                        return Err(ParseError::new("multiple primary key definitions", name.span));
                    }
                    primary_key.push(name.clone());
                }
                columns.push(ColumnDef {
                    name: name.value,
                    column_type,
                    span: name.span,
                });
            }

            if self.eat(&Token::Comma)? {
                continue;
            }
            self.expect_token(Token::RParen)?;
            break;
        }

        if primary_key.is_empty() {
            return Err(ParseError::new(
                format!("table '{}' has no PRIMARY KEY", table.name),
                table.span,
            ));
        }
        if self.eat_keyword("with")? {
            self.skip_to_end();
        }

        Ok(Statement::CreateTable(CreateTable {
            table,
            if_not_exists,
            columns,
            primary_key,
        }))
    }

    /// Parse a column type, unwrapping `frozen<...>`.
    fn parse_type(&mut self) -> Result<ColumnType, ParseError> {
        let name = self.expect_ident()?;
        let ty = match name.value.as_str() {
            "list" | "set" => {
                self.expect_token(Token::Lt)?;
                let elem = Box::new(self.parse_type()?);
                self.expect_token(Token::Gt)?;
                if name.value == "list" {
                    ColumnType::List(elem)
                } else {
                    ColumnType::Set(elem)
                }
            }
            "map" => {
                self.expect_token(Token::Lt)?;
                let key = Box::new(self.parse_type()?);
                self.expect_token(Token::Comma)?;
                let val = Box::new(self.parse_type()?);
                self.expect_token(Token::Gt)?;
                ColumnType::Map(key, val)
            }
            "frozen" => {
                self.expect_token(Token::Lt)?;
                let inner = self.parse_type()?;
                self.expect_token(Token::Gt)?;
                inner
            }
            other => ColumnType::from_scalar_name(other).ok_or_else(|| {
                ParseError::new(format!("unknown type '{}'", other), name.span)
            })?,
        };
        Ok(ty)
    }

    fn parse_drop(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword("table")?;
        let if_exists = self.parse_if_exists()?;
        let table = self.parse_table_name()?;
        Ok(Statement::DropTable { table, if_exists })
    }

    fn parse_insert(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword("into")?;
        let table = self.parse_table_name()?;

        self.expect_token(Token::LParen)?;
        let columns = self.parse_ident_list()?;
        self.expect_token(Token::RParen)?;

        let values_kw = self.expect_keyword("values")?;
        self.expect_token(Token::LParen)?;
        let (values, _) = self.parse_term_list(Token::RParen)?;
        if values.len() != columns.len() {
            return Err(ParseError::new(
                format!(
                    "{} columns but {} values in INSERT",
                    columns.len(),
                    values.len()
                ),
                values_kw,
            ));
        }

        let if_not_exists = self.parse_if_not_exists()?;
        Ok(Statement::Insert(Insert {
            table,
            columns,
            values,
            if_not_exists,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement, ParseError> {
        let table = self.parse_table_name()?;
        self.expect_keyword("set")?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_ident()?;
            self.expect_token(Token::Eq)?;
            let term = self.parse_term()?;
            assignments.push((column, term));
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        let relations = self.parse_where(true)?;
        let if_exists = self.parse_if_exists()?;
        Ok(Statement::Update(Update {
            table,
            assignments,
            relations,
            if_exists,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword("from")?;
        let table = self.parse_table_name()?;
        let relations = self.parse_where(true)?;
        let if_exists = self.parse_if_exists()?;
        Ok(Statement::Delete(Delete {
            table,
            relations,
            if_exists,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement, ParseError> {
        let selection = if self.eat(&Token::Star)? {
            Selection::All
        } else {
            let first = self.expect_ident()?;
            if first.value == "count" && self.eat(&Token::LParen)? {
                let arg = self.next_token()?;
                if !matches!(arg.token, Token::Star | Token::Int(1)) {
                    return Err(ParseError::new("expected COUNT(*) or COUNT(1)", arg.span));
                }
                self.expect_token(Token::RParen)?;
                Selection::Count
            } else {
                let mut columns = vec![first];
                while self.eat(&Token::Comma)? {
                    columns.push(self.expect_ident()?);
                }
                Selection::Columns(columns)
            }
        };

        self.expect_keyword("from")?;
        let table = self.parse_table_name()?;
        let relations = self.parse_where(false)?;

        let limit = if self.eat_keyword("limit")? {
            let tok = self.next_token()?;
            match tok.token {
                Token::Int(n) if n > 0 => Some(Spanned::new(n as u64, tok.span)),
                _ => {
                    return Err(ParseError::new("LIMIT must be a positive integer", tok.span))
                }
            }
        } else {
            None
        };

        let allow_filtering = if self.eat_keyword("allow")? {
            self.expect_keyword("filtering")?;
            true
        } else {
            false
        };

        Ok(Statement::Select(Select {
            table,
            selection,
            relations,
            limit,
            allow_filtering,
        }))
    }

    fn parse_truncate(&mut self) -> Result<Statement, ParseError> {
        self.eat_keyword("table")?;
        let table = self.parse_table_name()?;
        Ok(Statement::Truncate { table })
    }

    /// Parse `WHERE rel [AND rel]*`.
    fn parse_where(&mut self, required: bool) -> Result<Vec<Relation>, ParseError> {
        if !self.eat_keyword("where")? {
            if required {
                return Err(self.end_error("expected WHERE"));
            }
            return Ok(Vec::new());
        }
        let mut relations = vec![self.parse_relation()?];
        while self.eat_keyword("and")? {
            relations.push(self.parse_relation()?);
        }
        Ok(relations)
    }

    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        let column = self.expect_ident()?;
        let op = if self.eat(&Token::Eq)? {
            RelationOp::Eq(self.parse_term()?)
        } else if self.eat_keyword("in")? {
            self.expect_token(Token::LParen)?;
            let (terms, _) = self.parse_term_list(Token::RParen)?;
            RelationOp::In(terms)
        } else {
            return Err(ParseError::new(
                format!("expected '=' or IN after '{}'", column.value),
                column.span,
            ));
        };
        Ok(Relation { column, op })
    }

    fn parse_table_name(&mut self) -> Result<TableName, ParseError> {
        let first = self.expect_ident()?;
        if self.eat(&Token::Dot)? {
            let second = self.expect_ident()?;
            return Ok(TableName {
                keyspace: Some(first.value),
                name: second.value,
                span: first.span.merge(second.span),
            });
        }
        Ok(TableName {
            keyspace: None,
            name: first.value,
            span: first.span,
        })
    }

    fn parse_ident_list(&mut self) -> Result<Vec<Spanned<String>>, ParseError> {
        let mut idents = vec![self.expect_ident()?];
        while self.eat(&Token::Comma)? {
            idents.push(self.expect_ident()?);
        }
        Ok(idents)
    }

    /// Parse a term.
    fn parse_term(&mut self) -> Result<Spanned<Term>, ParseError> {
        let tok = self.next_token()?;
        let mut span = tok.span;
        let term = match tok.token {
            Token::Int(i) => Term::Int(i),
            Token::Float(f) => Term::Float(f),
            Token::String(s) => Term::Text(s),
            Token::Uuid(u) => Term::Uuid(u),
            Token::Blob(b) => Term::Blob(b),
            Token::Marker => {
                self.markers += 1;
                Term::Marker(self.markers - 1)
            }
            Token::Ident(ref word) if word.eq_ignore_ascii_case("true") => Term::Bool(true),
            Token::Ident(ref word) if word.eq_ignore_ascii_case("false") => Term::Bool(false),
            Token::Ident(ref word) if word.eq_ignore_ascii_case("null") => Term::Null,
            Token::LBracket => {
                let (items, end) = self.parse_term_list(Token::RBracket)?;
                span = span.merge(end);
                Term::List(items)
            }
            Token::LBrace => {
                let (term, end) = self.parse_brace_literal()?;
                span = span.merge(end);
                term
            }
            other => {
                return Err(ParseError::new(
                    format!("expected a value, found {:?}", other),
                    tok.span,
                ))
            }
        };
        Ok(Spanned::new(term, span))
    }

    /// Parse comma-separated terms up to and including `close`.
    fn parse_term_list(&mut self, close: Token) -> Result<(Vec<Spanned<Term>>, Span), ParseError> {
        let mut items = Vec::new();
        if let Some(end) = self.eat_span(&close)? {
            return Ok((items, end));
        }
        loop {
            items.push(self.parse_term()?);
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        let end = self.expect_token(close)?.span;
        Ok((items, end))
    }

    /// Parse the rest of `{...}`: a set, or a map when the first item is
    /// followed by `:`.
    fn parse_brace_literal(&mut self) -> Result<(Term, Span), ParseError> {
        if let Some(end) = self.eat_span(&Token::RBrace)? {
            return Ok((Term::Set(Vec::new()), end));
        }
        let first = self.parse_term()?;
        if self.eat(&Token::Colon)? {
            let mut entries = vec![(first, self.parse_term()?)];
            while self.eat(&Token::Comma)? {
                let key = self.parse_term()?;
                self.expect_token(Token::Colon)?;
                entries.push((key, self.parse_term()?));
            }
            let end = self.expect_token(Token::RBrace)?.span;
            return Ok((Term::Map(entries), end));
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma)? {
            items.push(self.parse_term()?);
        }
        let end = self.expect_token(Token::RBrace)?.span;
        Ok((Term::Set(items), end))
    }

    fn parse_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if !self.eat_keyword("if")? {
            return Ok(false);
        }
        self.expect_keyword("not")?;
        self.expect_keyword("exists")?;
        Ok(true)
    }

    fn parse_if_exists(&mut self) -> Result<bool, ParseError> {
        if !self.eat_keyword("if")? {
            return Ok(false);
        }
        self.expect_keyword("exists")?;
        Ok(true)
    }

    fn skip_to_end(&mut self) {
        while let Some(tok) = self.lexer.peek() {
            if tok.token == Token::Semicolon {
                break;
            }
            self.lexer.next_token();
        }
    }

    fn peek_keyword(&mut self, keyword: &str) -> bool {
        self.lexer
            .peek()
            .is_some_and(|tok| tok.token.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> Result<bool, ParseError> {
        if self.peek_keyword(keyword) {
            self.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Span, ParseError> {
        let tok = self.next_token()?;
        if tok.token.is_keyword(keyword) {
            Ok(tok.span)
        } else {
            Err(ParseError::new(
                format!("expected {}, found {:?}", keyword.to_ascii_uppercase(), tok.token),
                tok.span,
            ))
        }
    }

    fn eat(&mut self, expected: &Token) -> Result<bool, ParseError> {
        Ok(self.eat_span(expected)?.is_some())
    }

    fn eat_span(&mut self, expected: &Token) -> Result<Option<Span>, ParseError> {
        if self.lexer.peek().is_some_and(|tok| &tok.token == expected) {
            return Ok(Some(self.next_token()?.span));
        }
        Ok(None)
    }

    /// Expect an identifier; unquoted names fold to lower case.
    fn expect_ident(&mut self) -> Result<Spanned<String>, ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Ident(name) => Ok(Spanned::new(name.to_ascii_lowercase(), tok.span)),
            Token::QuotedIdent(name) => Ok(Spanned::new(name, tok.span)),
            _ => Err(ParseError::new(
                format!("expected identifier, found {:?}", tok.token),
                tok.span,
            )),
        }
    }

    /// Expect and consume a specific token.
    fn expect_token(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {:?}, found {:?}", expected, tok.token),
                tok.span,
            ))
        }
    }

    /// Get the next token or error if the input ran out.
    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        match self.lexer.next_token() {
            Some(tok) => Ok(tok),
            None => Err(self.end_error("unexpected end of input")),
        }
    }

    fn end_error(&self, message: &str) -> ParseError {
        match self.lexer.invalid() {
            Some(span) => ParseError::new("unrecognized input", span),
            None => ParseError::new(message, Span::at(self.source.len())),
        }
    }
}

/// Parse a single statement.
pub fn parse(source: &str) -> Result<Statement, ParseError> {
    Parser::new(source).parse_statement()
}
