//! cqlmap wire data model.
//!
//! Types shared by the driver seam and the mapping layer. Nothing in here does
//! I/O; a driver produces [`ResultSet`]s and [`DriverError`]s, the mapping layer
//! consumes them.
//!
//! # Modules
//!
//! - [`value`] - Wire values, collections and decimals
//! - [`types`] - Column types as declared in table schemas
//! - [`consistency`] - Per-statement consistency levels
//! - [`statement`] - Statements with positional bound values
//! - [`result`] - Rows, result sets and row iteration
//! - [`error`] - Driver error codes and binding errors

pub mod consistency;
pub mod error;
pub mod result;
pub mod statement;
pub mod types;
pub mod value;

pub use consistency::Consistency;
pub use error::{BindError, DriverError, ErrorCode, InvalidDecimal, MissingRow};
pub use result::{ColumnSpec, ResultSet, Row, RowIter};
pub use statement::Statement;
pub use types::ColumnType;
pub use value::{Collection, CollectionKind, Decimal, Value};
