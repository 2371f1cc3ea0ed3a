//! Result sets returned by the driver.

use std::sync::Arc;

use crate::error::MissingRow;
use crate::types::ColumnType;
use crate::value::Value;

/// Name and type of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name as selected.
    pub name: String,
    /// Declared type.
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Create a new column spec.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// One result row.
///
/// Column metadata is shared with the owning result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[ColumnSpec]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row over shared column metadata.
    pub fn new(columns: Arc<[ColumnSpec]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Number of values in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a zero-based column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the named column.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        self.values.get(index)
    }

    /// Column metadata.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// All values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// The rows produced by one request.
///
/// A position may hold no row when the driver failed to materialise it; row
/// iteration reports that as [`MissingRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Arc<[ColumnSpec]>,
    rows: Vec<Option<Row>>,
}

impl ResultSet {
    /// Create an empty result set with the given columns.
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns: columns.into(),
            rows: Vec::new(),
        }
    }

    /// Result of a statement that returns no rows.
    pub fn void() -> Self {
        Self::new(Vec::new())
    }

    /// Append a row of values in column order.
    pub fn push_row(&mut self, values: Vec<Value>) {
        let row = Row::new(Arc::clone(&self.columns), values);
        self.rows.push(Some(row));
    }

    /// Append a position without a row.
    pub fn push_missing(&mut self) {
        self.rows.push(None);
    }

    /// Replace the row at `index` with a missing position.
    pub fn drop_row(&mut self, index: usize) -> bool {
        match self.rows.get_mut(index) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Column metadata.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Zero-based index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Number of row positions.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result holds no row positions.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row, if present.
    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first().and_then(Option::as_ref)
    }

    /// Iterate over row positions in order.
    pub fn rows(&self) -> RowIter<'_> {
        RowIter {
            inner: self.rows.iter().enumerate(),
        }
    }
}

/// Iterator over the rows of a [`ResultSet`].
pub struct RowIter<'a> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, Option<Row>>>,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Result<&'a Row, MissingRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, slot) = self.inner.next()?;
        Some(slot.as_ref().ok_or(MissingRow { index }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_columns() -> ResultSet {
        ResultSet::new(vec![
            ColumnSpec::new("docid", ColumnType::Int),
            ColumnSpec::new("value", ColumnType::Text),
        ])
    }

    #[test]
    fn test_rows_share_columns() {
        let mut rs = two_columns();
        rs.push_row(vec![Value::Int(1), Value::Text("a".into())]);
        rs.push_row(vec![Value::Int(2), Value::Null]);

        assert_eq!(rs.row_count(), 2);
        assert_eq!(rs.column_index("value"), Some(1));
        let first = rs.first_row().unwrap();
        assert_eq!(first.get_by_name("value"), Some(&Value::Text("a".into())));
        assert_eq!(first.columns().len(), 2);
        assert_eq!(first.get(2), None);
    }

    #[test]
    fn test_missing_row_is_reported_in_place() {
        let mut rs = two_columns();
        rs.push_row(vec![Value::Int(1), Value::Text("a".into())]);
        rs.push_row(vec![Value::Int(2), Value::Text("b".into())]);
        assert!(rs.drop_row(1));
        assert!(!rs.drop_row(5));

        let items: Vec<_> = rs.rows().collect();
        assert!(items[0].is_ok());
        assert_eq!(items[1], Err(MissingRow { index: 1 }));
    }

    #[test]
    fn test_void_result() {
        let rs = ResultSet::void();
        assert!(rs.is_empty());
        assert!(rs.columns().is_empty());
        assert_eq!(rs.rows().count(), 0);
    }
}
