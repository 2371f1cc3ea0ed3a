//! Statements with positional bound values.

use crate::consistency::Consistency;
use crate::error::BindError;
use crate::value::Value;

/// A query ready for submission.
///
/// A statement is created with a fixed number of `?` parameters. Every slot
/// starts unbound; [`Statement::bind`] fills slots by zero-based index.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    query: String,
    values: Vec<Option<Value>>,
    consistency: Consistency,
}

impl Statement {
    /// Create a statement with `arity` unbound parameters.
    pub fn new(query: impl Into<String>, arity: usize) -> Self {
        Self {
            query: query.into(),
            values: vec![None; arity],
            consistency: Consistency::default(),
        }
    }

    /// Create a statement without parameters.
    pub fn simple(query: impl Into<String>) -> Self {
        Self::new(query, 0)
    }

    /// Set the consistency level.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Bind a value to the parameter at `index`.
    pub fn bind(&mut self, index: usize, value: Value) -> Result<(), BindError> {
        let arity = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(BindError::IndexOutOfRange { index, arity })?;
        *slot = Some(value);
        Ok(())
    }

    /// Mark every parameter unbound again.
    pub fn clear_bindings(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
    }

    /// The query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Parameter slots, `None` where unbound.
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// Requested consistency level.
    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    /// Check if every parameter has been bound.
    pub fn is_fully_bound(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}
