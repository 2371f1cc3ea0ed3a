//! Statement execution against the in-memory catalog.

use cqlmap_lang::parser::Parser;
use cqlmap_lang::span::offset_to_line_col;
use cqlmap_lang::{
    self as cql, CreateTable, Delete, Insert, Relation, RelationOp, Select, Selection, TableName,
    Term, Update,
};
use cqlmap_proto::{ColumnSpec, ColumnType, DriverError, ErrorCode, ResultSet, Statement, Value};
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use super::catalog::{Catalog, Table};
use super::coerce::term_to_value;
use super::key::encode_key;
use crate::session::ExecResult;

const FILTERING_REQUIRED: &str = "Cannot execute this query as it might involve data filtering and \
     thus may have unpredictable performance. If you want to execute this query despite the \
     performance unpredictability, use ALLOW FILTERING";

/// Parse, bind and run one statement.
///
/// `keyspace` is the session's current keyspace; `USE` replaces it.
pub(crate) fn execute(
    catalog: &Catalog,
    keyspace: &Mutex<Option<String>>,
    statement: &Statement,
) -> ExecResult {
    let query = statement.query();
    let mut parser = Parser::new(query);
    let parsed = parser.parse_statement().map_err(|e| {
        let (line, col) = offset_to_line_col(query, e.span.start);
        DriverError::new(ErrorCode::Syntax, format!("line {}:{} {}", line, col, e.message))
    })?;

    let markers = parser.marker_count();
    if markers != statement.arity() {
        return Err(DriverError::invalid(format!(
            "there were {} markers(?) in CQL but {} bound variables",
            markers,
            statement.arity()
        )));
    }
    let params = statement
        .values()
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.clone()
                .ok_or_else(|| DriverError::invalid(format!("value for marker {} is unbound", i)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let exec = Executor {
        catalog,
        keyspace,
        params: &params,
    };
    match &parsed {
        cql::Statement::Use(name) => exec.use_keyspace(&name.value),
        cql::Statement::CreateKeyspace {
            name,
            if_not_exists,
        } => exec.create_keyspace(&name.value, *if_not_exists),
        cql::Statement::CreateTable(ct) => exec.create_table(ct),
        cql::Statement::DropTable { table, if_exists } => exec.drop_table(table, *if_exists),
        cql::Statement::Insert(insert) => exec.insert(insert),
        cql::Statement::Update(update) => exec.update(update),
        cql::Statement::Delete(delete) => exec.delete(delete),
        cql::Statement::Select(select) => exec.select(select),
        cql::Statement::Truncate { table } => exec.truncate(table),
    }
}

struct Executor<'a> {
    catalog: &'a Catalog,
    keyspace: &'a Mutex<Option<String>>,
    params: &'a [Value],
}

impl Executor<'_> {
    fn use_keyspace(&self, name: &str) -> ExecResult {
        if !self.catalog.has_keyspace(name) {
            return Err(DriverError::invalid(format!("Keyspace '{}' does not exist", name)));
        }
        *self.keyspace.lock() = Some(name.to_string());
        Ok(ResultSet::void())
    }

    fn create_keyspace(&self, name: &str, if_not_exists: bool) -> ExecResult {
        if !self.catalog.create_keyspace(name) && !if_not_exists {
            return Err(DriverError::new(
                ErrorCode::AlreadyExists,
                format!("Keyspace {} already exists", name),
            ));
        }
        Ok(ResultSet::void())
    }

    fn create_table(&self, ct: &CreateTable) -> ExecResult {
        let (keyspace, qualified) = self.qualify(&ct.table)?;
        if !self.catalog.has_keyspace(&keyspace) {
            return Err(DriverError::invalid(format!("Keyspace {} doesn't exist", keyspace)));
        }

        let mut columns: Vec<ColumnSpec> = Vec::with_capacity(ct.columns.len());
        for def in &ct.columns {
            if columns.iter().any(|c| c.name == def.name) {
                return Err(DriverError::invalid(format!(
                    "Multiple definition of identifier {}",
                    def.name
                )));
            }
            columns.push(ColumnSpec::new(def.name.clone(), def.column_type.clone()));
        }

        let mut key_columns = Vec::with_capacity(ct.primary_key.len());
        for key in &ct.primary_key {
            let index = columns
                .iter()
                .position(|c| c.name == key.value)
                .ok_or_else(|| {
                    DriverError::invalid(format!(
                        "Unknown definition {} referenced in PRIMARY KEY",
                        key.value
                    ))
                })?;
            if columns[index].column_type.collection_kind().is_some() {
                return Err(DriverError::invalid(format!(
                    "Invalid collection type for PRIMARY KEY component {}",
                    key.value
                )));
            }
            if key_columns.contains(&index) {
                return Err(DriverError::invalid(format!(
                    "Duplicate definition {} in PRIMARY KEY",
                    key.value
                )));
            }
            key_columns.push(index);
        }

        match self.catalog.tables().entry(qualified.clone()) {
            Entry::Occupied(_) if ct.if_not_exists => Ok(ResultSet::void()),
            Entry::Occupied(_) => Err(DriverError::new(
                ErrorCode::AlreadyExists,
                format!("Object {} already exists", qualified),
            )),
            Entry::Vacant(slot) => {
                slot.insert(Table::new(ct.table.name.clone(), columns, key_columns));
                Ok(ResultSet::void())
            }
        }
    }

    fn drop_table(&self, table: &TableName, if_exists: bool) -> ExecResult {
        let (_, qualified) = self.qualify(table)?;
        if self.catalog.tables().remove(&qualified).is_none() && !if_exists {
            return Err(unconfigured(table));
        }
        Ok(ResultSet::void())
    }

    fn insert(&self, insert: &Insert) -> ExecResult {
        self.with_table(&insert.table, |table| {
            let mut row = table.empty_row();
            let mut assigned = vec![false; row.len()];
            for (column, term) in insert.columns.iter().zip(&insert.values) {
                let (index, ty) = table.column(&column.value)?;
                if assigned[index] {
                    return Err(DriverError::invalid(format!(
                        "Multiple definitions found for column {}",
                        column.value
                    )));
                }
                row[index] = term_to_value(&term.value, ty, self.params)?;
                assigned[index] = true;
            }
            for &k in &table.key_columns {
                let name = &table.columns[k].name;
                if !assigned[k] {
                    return Err(DriverError::invalid(format!(
                        "Some primary key parts are missing: {}",
                        name
                    )));
                }
                if row[k].is_null() {
                    return Err(DriverError::invalid(format!(
                        "Invalid null value for primary key part {}",
                        name
                    )));
                }
            }

            let key = table.key_of(&row);
            if insert.if_not_exists {
                if let Some(existing) = table.rows.get(&key) {
                    return Ok(applied_result(table, false, Some(existing)));
                }
                table.rows.insert(key, row);
                return Ok(applied_result(table, true, None));
            }

            let blank = table.empty_row();
            let stored = table.rows.entry(key).or_insert(blank);
            for (index, value) in row.into_iter().enumerate() {
                if assigned[index] {
                    stored[index] = value;
                }
            }
            Ok(ResultSet::void())
        })
    }

    fn update(&self, update: &Update) -> ExecResult {
        self.with_table(&update.table, |table| {
            let key_row = self.key_row(table, &update.relations)?;
            let mut assignments = Vec::with_capacity(update.assignments.len());
            for (column, term) in &update.assignments {
                let (index, ty) = table.column(&column.value)?;
                if table.is_key_column(index) {
                    return Err(DriverError::invalid(format!(
                        "PRIMARY KEY part {} found in SET part",
                        column.value
                    )));
                }
                assignments.push((index, term_to_value(&term.value, ty, self.params)?));
            }

            let key = table.key_of(&key_row);
            if update.if_exists && !table.rows.contains_key(&key) {
                return Ok(applied_result(table, false, None));
            }
            let stored = table.rows.entry(key).or_insert(key_row);
            for (index, value) in assignments {
                stored[index] = value;
            }
            if update.if_exists {
                return Ok(applied_result(table, true, None));
            }
            Ok(ResultSet::void())
        })
    }

    fn delete(&self, delete: &Delete) -> ExecResult {
        self.with_table(&delete.table, |table| {
            let key_row = self.key_row(table, &delete.relations)?;
            let key = table.key_of(&key_row);
            let removed = table.rows.remove(&key).is_some();
            if delete.if_exists {
                return Ok(applied_result(table, removed, None));
            }
            Ok(ResultSet::void())
        })
    }

    fn select(&self, select: &Select) -> ExecResult {
        self.with_table(&select.table, |table| {
            let mut filters: Vec<(usize, Vec<Vec<u8>>)> = Vec::with_capacity(select.relations.len());
            for relation in &select.relations {
                let (index, ty) = table.column(&relation.column.value)?;
                if !table.is_key_column(index) && !select.allow_filtering {
                    return Err(DriverError::invalid(FILTERING_REQUIRED));
                }
                let terms: Vec<&Term> = match &relation.op {
                    RelationOp::Eq(term) => vec![&term.value],
                    RelationOp::In(terms) => terms.iter().map(|t| &t.value).collect(),
                };
                let mut accepted = Vec::with_capacity(terms.len());
                for term in terms {
                    accepted.push(encode_key([&self.condition_value(relation, term, ty)?]));
                }
                filters.push((index, accepted));
            }

            let limit = select.limit.as_ref().map_or(usize::MAX, |l| l.value as usize);
            let matching = table.rows.values().filter(|row| {
                filters
                    .iter()
                    .all(|(index, accepted)| accepted.contains(&encode_key([&row[*index]])))
            });

            let indices: Vec<usize> = match &select.selection {
                Selection::Count => {
                    let count = matching.count();
                    let mut rs = ResultSet::new(vec![ColumnSpec::new("count", ColumnType::BigInt)]);
                    rs.push_row(vec![Value::BigInt(count as i64)]);
                    return Ok(rs);
                }
                Selection::All => (0..table.columns.len()).collect(),
                Selection::Columns(columns) => columns
                    .iter()
                    .map(|c| table.column(&c.value).map(|(i, _)| i))
                    .collect::<Result<_, _>>()?,
            };

            let mut rs = ResultSet::new(indices.iter().map(|i| table.columns[*i].clone()).collect());
            for row in matching.take(limit) {
                rs.push_row(indices.iter().map(|i| row[*i].clone()).collect());
            }
            Ok(rs)
        })
    }

    fn truncate(&self, table: &TableName) -> ExecResult {
        self.with_table(table, |table| {
            table.rows.clear();
            Ok(ResultSet::void())
        })
    }

    /// A row holding only the primary key, taken from `col = value` relations.
    fn key_row(&self, table: &Table, relations: &[Relation]) -> Result<Vec<Value>, DriverError> {
        let mut row = table.empty_row();
        for relation in relations {
            let (index, ty) = table.column(&relation.column.value)?;
            if !table.is_key_column(index) {
                return Err(DriverError::invalid(format!(
                    "Non PRIMARY KEY columns found in where clause: {}",
                    relation.column.value
                )));
            }
            let RelationOp::Eq(term) = &relation.op else {
                return Err(DriverError::invalid(format!(
                    "IN is not supported on {} for this statement",
                    relation.column.value
                )));
            };
            row[index] = self.condition_value(relation, &term.value, ty)?;
        }
        if let Some(&missing) = table.key_columns.iter().find(|k| row[**k].is_null()) {
            return Err(DriverError::invalid(format!(
                "Some primary key parts are missing: {}",
                table.columns[missing].name
            )));
        }
        Ok(row)
    }

    fn condition_value(
        &self,
        relation: &Relation,
        term: &Term,
        ty: &ColumnType,
    ) -> Result<Value, DriverError> {
        let value = term_to_value(term, ty, self.params)?;
        if value.is_null() {
            return Err(DriverError::invalid(format!(
                "Invalid null value in condition for column {}",
                relation.column.value
            )));
        }
        Ok(value)
    }

    fn with_table<R>(
        &self,
        table: &TableName,
        f: impl FnOnce(&mut Table) -> Result<R, DriverError>,
    ) -> Result<R, DriverError> {
        let (_, qualified) = self.qualify(table)?;
        let mut entry = self
            .catalog
            .tables()
            .get_mut(&qualified)
            .ok_or_else(|| unconfigured(table))?;
        f(entry.value_mut())
    }

    /// Keyspace and `keyspace.table` for a possibly unqualified name.
    fn qualify(&self, table: &TableName) -> Result<(String, String), DriverError> {
        let keyspace = match &table.keyspace {
            Some(ks) => ks.clone(),
            None => self.keyspace.lock().clone().ok_or_else(|| {
                DriverError::invalid(
                    "No keyspace has been specified. USE a keyspace, or explicitly specify keyspace.tablename",
                )
            })?,
        };
        let qualified = format!("{}.{}", keyspace, table.name);
        Ok((keyspace, qualified))
    }
}

fn unconfigured(table: &TableName) -> DriverError {
    DriverError::invalid(format!("unconfigured table {}", table.name))
}

/// Result of a conditional write: `[applied]`, plus the current row when a
/// conflicting row blocked the write.
fn applied_result(table: &Table, applied: bool, existing: Option<&Vec<Value>>) -> ResultSet {
    let mut columns = vec![ColumnSpec::new("[applied]", ColumnType::Boolean)];
    let mut values = vec![Value::Boolean(applied)];
    if let Some(existing) = existing {
        columns.extend(table.columns.iter().cloned());
        values.extend(existing.iter().cloned());
    }
    let mut rs = ResultSet::new(columns);
    rs.push_row(values);
    rs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixture {
        catalog: Catalog,
        keyspace: Mutex<Option<String>>,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                catalog: Catalog::default(),
                keyspace: Mutex::new(None),
            };
            fixture.run("create keyspace ks with replication = {'class': 'SimpleStrategy'}").unwrap();
            fixture.run("use ks").unwrap();
            fixture
        }

        fn run(&self, query: &str) -> ExecResult {
            execute(&self.catalog, &self.keyspace, &Statement::simple(query))
        }

        fn run_bound(&self, query: &str, values: Vec<Value>) -> ExecResult {
            let mut stmt = Statement::new(query, values.len());
            for (i, v) in values.into_iter().enumerate() {
                stmt.bind(i, v).unwrap();
            }
            execute(&self.catalog, &self.keyspace, &stmt)
        }

        fn texts(&self, query: &str) -> Vec<String> {
            self.run(query)
                .unwrap()
                .rows()
                .map(|r| r.unwrap().get(0).and_then(Value::as_str).unwrap_or("").to_string())
                .collect()
        }
    }

    #[test]
    fn test_insert_select_by_key_and_in() {
        let fx = Fixture::new();
        fx.run("create table other_test_data (docid int primary key, value text)").unwrap();
        for (id, v) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            fx.run(&format!("insert into other_test_data (docid, value) values ({}, '{}')", id, v))
                .unwrap();
        }
        assert_eq!(fx.texts("select value from other_test_data where docid in (1, 2, 5)"), vec!["a", "b"]);
        assert_eq!(fx.texts("select value from other_test_data where docid = 3"), vec!["c"]);
        assert!(fx.texts("select value from other_test_data where docid in (9, 10)").is_empty());

        let count = fx.run("select count(*) from other_test_data").unwrap();
        assert_eq!(count.first_row().unwrap().get(0), Some(&Value::BigInt(4)));
    }

    #[test]
    fn test_filtering_on_regular_column_needs_allow_filtering() {
        let fx = Fixture::new();
        fx.run("create table t (k int primary key, v text)").unwrap();
        fx.run("insert into t (k, v) values (1, 'x')").unwrap();
        let err = fx.run("select k from t where v = 'x'").unwrap_err();
        assert!(err.message.contains("ALLOW FILTERING"));
        let rs = fx.run("select k from t where v = 'x' allow filtering").unwrap();
        assert_eq!(rs.row_count(), 1);
    }

    #[test]
    fn test_insert_if_not_exists_reports_applied() {
        let fx = Fixture::new();
        fx.run("create table t (k int primary key, v text)").unwrap();

        let first = fx.run("insert into t (k, v) values (1, 'a') if not exists").unwrap();
        assert_eq!(first.columns()[0].name, "[applied]");
        assert_eq!(first.first_row().unwrap().get(0), Some(&Value::Boolean(true)));

        let second = fx.run("insert into t (k, v) values (1, 'b') if not exists").unwrap();
        let row = second.first_row().unwrap();
        assert_eq!(row.get(0), Some(&Value::Boolean(false)));
        assert_eq!(row.get_by_name("v"), Some(&Value::Text("a".into())));
        assert_eq!(fx.texts("select v from t where k = 1"), vec!["a"]);
    }

    #[test]
    fn test_bound_values_and_marker_mismatch() {
        let fx = Fixture::new();
        fx.run("create table t (k int primary key, v text)").unwrap();
        fx.run_bound(
            "insert into t (k, v) values (?, ?)",
            vec![Value::Int(7), Value::Text("seven".into())],
        )
        .unwrap();
        assert_eq!(fx.texts("select v from t where k = 7"), vec!["seven"]);

        let err = fx.run_bound("insert into t (k, v) values (?, ?)", vec![Value::Int(8)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);
        assert!(err.message.contains("2 markers"));

        let err = fx
            .run_bound("insert into t (k, v) values (?, ?)", vec![Value::Text("x".into()), Value::Null])
            .unwrap_err();
        assert!(err.message.contains("Invalid text value for column of type int"));
    }

    #[test]
    fn test_update_delete_and_truncate() {
        let fx = Fixture::new();
        fx.run("create table t (k int primary key, v text)").unwrap();
        fx.run("update t set v = 'u' where k = 1").unwrap();
        assert_eq!(fx.texts("select v from t where k = 1"), vec!["u"]);

        let rs = fx.run("update t set v = 'w' where k = 2 if exists").unwrap();
        assert_eq!(rs.first_row().unwrap().get(0), Some(&Value::Boolean(false)));

        fx.run("delete from t where k = 1").unwrap();
        assert!(fx.texts("select v from t where k = 1").is_empty());

        fx.run("insert into t (k, v) values (3, 'x')").unwrap();
        fx.run("truncate t").unwrap();
        let count = fx.run("select count(*) from t").unwrap();
        assert_eq!(count.first_row().unwrap().get(0), Some(&Value::BigInt(0)));
    }

    #[test]
    fn test_errors_carry_cassandra_like_codes() {
        let fx = Fixture::new();
        assert_eq!(fx.run("selec * from t").unwrap_err().code, ErrorCode::Syntax);
        let err = fx.run("truncate nope").unwrap_err();
        assert_eq!(err.message, "unconfigured table nope");
        fx.run("create table t (k int primary key)").unwrap();
        assert_eq!(
            fx.run("create table t (k int primary key)").unwrap_err().code,
            ErrorCode::AlreadyExists
        );
        fx.run("create table if not exists t (k int primary key)").unwrap();
        assert!(fx.run("use missing").is_err());
        assert!(fx.run("insert into t (k) values (null)").is_err());
    }

    #[test]
    fn test_unqualified_name_without_keyspace() {
        let catalog = Catalog::default();
        let keyspace = Mutex::new(None);
        let err = execute(&catalog, &keyspace, &Statement::simple("select * from t")).unwrap_err();
        assert!(err.message.starts_with("No keyspace has been specified"));
    }

    #[test]
    fn test_collections_round_trip_through_storage() {
        let fx = Fixture::new();
        fx.run(
            "create table coll_test_data (docid int primary key, value_list list<int>, \
             value_set set<int>, value_map map<int, int>)",
        )
        .unwrap();
        fx.run(
            "insert into coll_test_data (docid, value_list, value_set, value_map) \
             values (1, [3, 1, 3], {3, 1, 3}, {8: 16, 1: 2, 4: 8, 2: 4})",
        )
        .unwrap();
        let rs = fx
            .run("select value_list, value_set, value_map from coll_test_data where docid = 1")
            .unwrap();
        let row = rs.first_row().unwrap();
        let ints = |i: usize| -> Vec<i32> {
            row.get(i)
                .and_then(Value::as_collection)
                .unwrap()
                .iter()
                .map(|v| v.as_i32().unwrap())
                .collect()
        };
        assert_eq!(ints(0), vec![3, 1, 3]);
        assert_eq!(ints(1), vec![1, 3]);
        assert_eq!(ints(2), vec![1, 2, 2, 4, 4, 8, 8, 16]);
    }
}
