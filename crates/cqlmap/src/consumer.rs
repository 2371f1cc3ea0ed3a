//! Row consumers.
//!
//! A [`FetchConsumer`] receives each row of a fetch in order and decides
//! whether iteration continues. The stock consumers cover the usual shapes:
//! one value ([`Fetcher`]), a column of values ([`ConFetcher`]), whole rows
//! as tuples ([`RowsFetcher`]) and the `[applied]` flag of a conditional
//! write ([`AppliedProbe`]).

use std::fmt;
use std::marker::PhantomData;

use crate::codec::WireDecode;
use crate::command::Command;
use crate::conn::Conn;
use crate::extract::{Field, RowView};

/// Receives the rows of a fetch.
pub trait FetchConsumer: Send {
    /// Handle one row. Returning false stops the fetch, which then reports
    /// failure.
    fn consume(&mut self, row: &RowView<'_>) -> bool;

    /// Whether any row was seen, for consumers that do not expose their
    /// storage.
    fn was_any_value_set(&self) -> bool {
        false
    }
}

impl<C: FetchConsumer + ?Sized> FetchConsumer for &mut C {
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        (**self).consume(row)
    }

    fn was_any_value_set(&self) -> bool {
        (**self).was_any_value_set()
    }
}

impl<C: FetchConsumer + ?Sized> FetchConsumer for Box<C> {
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        (**self).consume(row)
    }

    fn was_any_value_set(&self) -> bool {
        (**self).was_any_value_set()
    }
}

/// Reads the first column into a single value. With several rows the last
/// one wins.
#[derive(Debug, Clone, Default)]
pub struct Fetcher<T> {
    value: T,
    was_set: bool,
    field: Field,
}

impl<T: WireDecode + Default + Send> Fetcher<T> {
    pub fn new() -> Self {
        Self {
            value: T::default(),
            was_set: false,
            field: Field::Required,
        }
    }

    /// A fetcher that accepts a null column.
    pub fn optional() -> Self {
        Self {
            field: Field::Optional,
            ..Self::new()
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Whether the last row seen was read successfully.
    pub fn was_set(&self) -> bool {
        self.was_set
    }

    /// Fetch through `conn`. True only if the fetch succeeded and returned a
    /// row.
    pub async fn fetch_from(&mut self, conn: &Conn, command: impl Into<Command>) -> bool {
        self.was_set = false;
        conn.fetch(command, self).await && self.was_set
    }
}

impl<T: WireDecode + Send> FetchConsumer for Fetcher<T> {
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        self.was_set = row.get_first(&mut self.value, self.field);
        self.was_set
    }

    fn was_any_value_set(&self) -> bool {
        self.was_set
    }
}

/// Collects the first column of every row into a container.
///
/// A row whose value cannot be read stops the fetch.
pub struct ConFetcher<T, C = Vec<T>> {
    items: C,
    count: usize,
    _item: PhantomData<fn() -> T>,
}

impl<T, C> ConFetcher<T, C>
where
    T: WireDecode + Default,
    C: Default + Extend<T> + Send,
{
    pub fn new() -> Self {
        Self {
            items: C::default(),
            count: 0,
            _item: PhantomData,
        }
    }

    pub fn items(&self) -> &C {
        &self.items
    }

    pub fn into_items(self) -> C {
        self.items
    }

    /// Rows collected.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Clear the container and fetch through `conn`.
    pub async fn fetch_from(&mut self, conn: &Conn, command: impl Into<Command>) -> bool {
        self.items = C::default();
        self.count = 0;
        conn.fetch(command, self).await
    }
}

impl<T, C> Default for ConFetcher<T, C>
where
    T: WireDecode + Default,
    C: Default + Extend<T> + Send,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> FetchConsumer for ConFetcher<T, C>
where
    T: WireDecode + Default,
    C: Extend<T> + Send,
{
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        let mut item = T::default();
        if !row.get_first(&mut item, Field::Required) {
            return false;
        }
        self.items.extend(Some(item));
        self.count += 1;
        true
    }

    fn was_any_value_set(&self) -> bool {
        self.count > 0
    }
}

impl<T, C: fmt::Debug> fmt::Debug for ConFetcher<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConFetcher")
            .field("items", &self.items)
            .field("count", &self.count)
            .finish()
    }
}

/// Builds a value from a whole row.
pub trait FromRow: Sized {
    fn from_row(row: &RowView<'_>) -> Option<Self>;
}

macro_rules! tuple_from_row {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: WireDecode + Default),+> FromRow for ($($name,)+) {
            fn from_row(row: &RowView<'_>) -> Option<Self> {
                Some(($(row.get::<$name>($idx)?,)+))
            }
        }
    };
}

tuple_from_row!(A: 0);
tuple_from_row!(A: 0, B: 1);
tuple_from_row!(A: 0, B: 1, C: 2);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Collects every row as an `R`, typically a tuple of column types.
#[derive(Debug, Clone)]
pub struct RowsFetcher<R> {
    rows: Vec<R>,
}

impl<R: FromRow + Send> RowsFetcher<R> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }
}

impl<R: FromRow + Send> Default for RowsFetcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FromRow + Send> FetchConsumer for RowsFetcher<R> {
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        match R::from_row(row) {
            Some(value) => {
                self.rows.push(value);
                true
            }
            None => false,
        }
    }

    fn was_any_value_set(&self) -> bool {
        !self.rows.is_empty()
    }
}

/// Reads the `[applied]` flag that conditional writes return in their first
/// column. A row that was not applied stops the fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppliedProbe {
    applied: bool,
}

impl AppliedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> bool {
        self.applied
    }
}

impl FetchConsumer for AppliedProbe {
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        row.get_first(&mut self.applied, Field::Required) && self.applied
    }

    fn was_any_value_set(&self) -> bool {
        self.applied
    }
}

/// A consumer made from a closure.
pub struct FnConsumer<F> {
    f: F,
    rows: usize,
}

impl<F> FetchConsumer for FnConsumer<F>
where
    F: FnMut(&RowView<'_>) -> bool + Send,
{
    fn consume(&mut self, row: &RowView<'_>) -> bool {
        self.rows += 1;
        (self.f)(row)
    }

    fn was_any_value_set(&self) -> bool {
        self.rows > 0
    }
}

impl<F> fmt::Debug for FnConsumer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConsumer").field("rows", &self.rows).finish()
    }
}

/// Wrap a closure as a [`FetchConsumer`].
pub fn consumer_fn<F>(f: F) -> FnConsumer<F>
where
    F: FnMut(&RowView<'_>) -> bool + Send,
{
    FnConsumer { f, rows: 0 }
}
