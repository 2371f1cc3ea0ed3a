//! Reading typed fields out of result rows.

use cqlmap_proto::{Row, Value};

use crate::codec::WireDecode;

/// Whether a null column counts as a successful read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Field {
    /// Null is missing data.
    #[default]
    Required,
    /// Null reads as the reset value.
    Optional,
}

/// Read column `index` of `row` into `out`.
///
/// A null column resets `out` and succeeds only for [`Field::Optional`] (or a
/// type that is itself nullable, such as `Option<T>`). A missing column resets
/// `out` and fails.
pub fn get_nth<T: WireDecode + ?Sized>(index: usize, out: &mut T, row: &Row, field: Field) -> bool {
    match row.get(index) {
        None => {
            out.reset();
            false
        }
        Some(value) if value.is_null() => {
            out.reset();
            T::NULLABLE || field == Field::Optional
        }
        Some(value) => out.extract(value),
    }
}

/// Read the first column of `row` into `out`.
pub fn get_first<T: WireDecode + ?Sized>(out: &mut T, row: &Row, field: Field) -> bool {
    get_nth(0, out, row, field)
}

/// A row handed to a [`FetchConsumer`](crate::FetchConsumer).
///
/// Carries the query text and the row position so that failed reads can be
/// logged with their context.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    row: &'a Row,
    query: &'a str,
    index: usize,
}

impl<'a> RowView<'a> {
    pub fn new(row: &'a Row, query: &'a str, index: usize) -> Self {
        Self { row, query, index }
    }

    pub fn row(&self) -> &'a Row {
        self.row
    }

    pub fn query(&self) -> &'a str {
        self.query
    }

    /// Position of this row in the result.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// The raw value of column `index`.
    pub fn value(&self, index: usize) -> Option<&'a Value> {
        self.row.get(index)
    }

    /// Like [`get_nth`], logging a failed read.
    pub fn get_nth<T: WireDecode + ?Sized>(&self, index: usize, out: &mut T, field: Field) -> bool {
        let ok = get_nth(index, out, self.row, field);
        if !ok {
            self.log_failure(index, std::any::type_name::<T>());
        }
        ok
    }

    /// Like [`get_first`], logging a failed read.
    pub fn get_first<T: WireDecode + ?Sized>(&self, out: &mut T, field: Field) -> bool {
        self.get_nth(0, out, field)
    }

    /// Read a required column into a fresh value.
    pub fn get<T: WireDecode + Default>(&self, index: usize) -> Option<T> {
        let mut out = T::default();
        self.get_nth(index, &mut out, Field::Required).then_some(out)
    }

    /// Read a required column by name.
    pub fn get_by_name<T: WireDecode + Default>(&self, name: &str) -> Option<T> {
        match self.row.columns().iter().position(|c| c.name == name) {
            Some(index) => self.get(index),
            None => {
                tracing::error!(query = %self.query, row = self.index, column = name, "No such column in result");
                None
            }
        }
    }

    fn log_failure(&self, column: usize, type_name: &str) {
        let found = self.row.get(column).map_or("missing", Value::type_name);
        tracing::error!(
            query = %self.query,
            row = self.index,
            column,
            expected = type_name,
            found,
            "Failed to read column"
        );
    }
}
