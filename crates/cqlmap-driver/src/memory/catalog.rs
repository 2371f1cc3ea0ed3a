//! Keyspaces and tables held by a [`MemoryCluster`](super::MemoryCluster).

use std::collections::BTreeMap;

use cqlmap_proto::{ColumnSpec, ColumnType, DriverError, Value};
use dashmap::{DashMap, DashSet};

use super::key::encode_key;

/// Schema and data of every keyspace.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    keyspaces: DashSet<String>,
    /// Tables keyed by `keyspace.table`.
    tables: DashMap<String, Table>,
}

impl Catalog {
    pub fn has_keyspace(&self, name: &str) -> bool {
        self.keyspaces.contains(name)
    }

    /// Returns false if the keyspace already existed.
    pub fn create_keyspace(&self, name: &str) -> bool {
        self.keyspaces.insert(name.to_string())
    }

    pub fn tables(&self) -> &DashMap<String, Table> {
        &self.tables
    }
}

/// One table: its columns and rows keyed by encoded primary key.
#[derive(Debug)]
pub(crate) struct Table {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    /// Indices into `columns`, partition columns first.
    pub key_columns: Vec<usize>,
    pub rows: BTreeMap<Vec<u8>, Vec<Value>>,
}

impl Table {
    pub fn new(name: String, columns: Vec<ColumnSpec>, key_columns: Vec<usize>) -> Self {
        Self {
            name,
            columns,
            key_columns,
            rows: BTreeMap::new(),
        }
    }

    /// Column index and type by name.
    pub fn column(&self, name: &str) -> Result<(usize, &ColumnType), DriverError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .map(|i| (i, &self.columns[i].column_type))
            .ok_or_else(|| DriverError::invalid(format!("Undefined column name {}", name)))
    }

    pub fn is_key_column(&self, index: usize) -> bool {
        self.key_columns.contains(&index)
    }

    /// Encoded primary key of a full row.
    pub fn key_of(&self, row: &[Value]) -> Vec<u8> {
        encode_key(self.key_columns.iter().map(|i| &row[*i]))
    }

    /// An all-null row.
    pub fn empty_row(&self) -> Vec<Value> {
        vec![Value::Null; self.columns.len()]
    }
}
