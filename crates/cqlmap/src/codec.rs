//! Conversion between wire values and Rust types.
//!
//! [`WireDecode`] reads a non-null column value into an existing slot and
//! [`WireEncode`] produces the value bound to a statement parameter.
//! Decoding is strict about wire types: an `i32` only reads `int`, an `i64`
//! only `bigint`/`counter`. Uuid slots read both `uuid` and `timeuuid`.
//!
//! Collections decode from the wire collection's item stream. Sequences and
//! sets accept `list` and `set` columns; maps read the stream as
//! key, value pairs.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::Deref;

use cqlmap_proto::{BindError, Collection, CollectionKind, Decimal, Value};
use uuid::Uuid;

use crate::refid::RefId;

/// Decoding from a wire value.
pub trait WireDecode {
    /// Whether a null column is a valid value for this type rather than
    /// missing data.
    const NULLABLE: bool = false;

    /// Decode `value` into `self`. Returns false if the wire type does not
    /// match; scalars are then left at their reset value, collections keep
    /// what was decoded before the failure.
    fn extract(&mut self, value: &Value) -> bool;

    /// Set `self` to the canonical empty value.
    fn reset(&mut self);
}

/// Encoding into a wire value for binding.
///
/// Argument lists are held across awaits, hence `Sync`.
pub trait WireEncode: Sync {
    fn to_wire(&self) -> Result<Value, BindError>;
}

impl<T: WireEncode + ?Sized> WireEncode for &T {
    fn to_wire(&self) -> Result<Value, BindError> {
        (**self).to_wire()
    }
}

/// Binds NULL whatever the column type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Null;

impl WireEncode for Null {
    fn to_wire(&self) -> Result<Value, BindError> {
        Ok(Value::Null)
    }
}

/// An owned byte buffer read from or bound to a `blob` column.
///
/// Decoding copies the bytes out of the result set, so a `Blob` stays valid
/// after the rows are gone and can be bound into later statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

macro_rules! scalar_codec {
    ($ty:ty, $reset:expr, $decode:expr, $wire:path) => {
        impl WireDecode for $ty {
            fn extract(&mut self, value: &Value) -> bool {
                match $decode(value) {
                    Some(decoded) => {
                        *self = decoded;
                        true
                    }
                    None => {
                        self.reset();
                        false
                    }
                }
            }

            fn reset(&mut self) {
                *self = $reset;
            }
        }

        impl WireEncode for $ty {
            fn to_wire(&self) -> Result<Value, BindError> {
                Ok($wire(self.clone()))
            }
        }
    };
}

scalar_codec!(bool, false, Value::as_bool, Value::Boolean);
scalar_codec!(i32, 0, Value::as_i32, Value::Int);
scalar_codec!(i64, 0, Value::as_i64, Value::BigInt);
scalar_codec!(f32, 0.0, Value::as_f32, Value::Float);
scalar_codec!(f64, 0.0, Value::as_f64, Value::Double);
scalar_codec!(
    String,
    String::new(),
    |v: &Value| v.as_str().map(str::to_owned),
    Value::Text
);
scalar_codec!(
    Blob,
    Blob::default(),
    |v: &Value| v.as_bytes().map(Blob::from),
    blob_value
);
scalar_codec!(
    Decimal,
    Decimal::default(),
    |v: &Value| v.as_decimal().cloned(),
    Value::Decimal
);
scalar_codec!(
    IpAddr,
    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    Value::as_inet,
    Value::Inet
);
scalar_codec!(
    Uuid,
    Uuid::nil(),
    |v: &Value| v.as_uuid().map(|b| Uuid::from_bytes(*b)),
    uuid_value
);
scalar_codec!(
    RefId,
    RefId::nil(),
    |v: &Value| v.as_uuid().map(|b| RefId::from_bytes(*b)),
    refid_value
);

fn blob_value(blob: Blob) -> Value {
    Value::Blob(blob.0)
}

fn uuid_value(uuid: Uuid) -> Value {
    Value::Uuid(uuid.into_bytes())
}

fn refid_value(id: RefId) -> Value {
    Value::Uuid(*id.as_bytes())
}

impl WireEncode for str {
    fn to_wire(&self) -> Result<Value, BindError> {
        Ok(Value::Text(self.to_owned()))
    }
}

impl WireEncode for [u8] {
    fn to_wire(&self) -> Result<Value, BindError> {
        Ok(Value::Blob(self.to_vec()))
    }
}

/// The raw wire value, null included.
impl WireDecode for Value {
    const NULLABLE: bool = true;

    fn extract(&mut self, value: &Value) -> bool {
        *self = value.clone();
        true
    }

    fn reset(&mut self) {
        *self = Value::Null;
    }
}

impl WireEncode for Value {
    fn to_wire(&self) -> Result<Value, BindError> {
        Ok(self.clone())
    }
}

/// Null reads as `None`.
impl<T: WireDecode + Default> WireDecode for Option<T> {
    const NULLABLE: bool = true;

    fn extract(&mut self, value: &Value) -> bool {
        if value.is_null() {
            *self = None;
            return true;
        }
        let mut inner = T::default();
        let ok = inner.extract(value);
        *self = ok.then_some(inner);
        ok
    }

    fn reset(&mut self) {
        *self = None;
    }
}

impl<T: WireEncode> WireEncode for Option<T> {
    fn to_wire(&self) -> Result<Value, BindError> {
        match self {
            Some(value) => value.to_wire(),
            None => Ok(Value::Null),
        }
    }
}

/// Items of a list or set value.
fn sequence_items(value: &Value) -> Option<&[Value]> {
    let collection = value.as_collection()?;
    match collection.kind() {
        CollectionKind::List | CollectionKind::Set => Some(collection.items()),
        CollectionKind::Map => None,
    }
}

/// Items of a map value, as an interleaved key/value stream.
fn map_items(value: &Value) -> Option<&[Value]> {
    let collection = value.as_collection()?;
    (collection.kind() == CollectionKind::Map).then(|| collection.items())
}

fn sequence_to_wire<'a, T, I>(kind: CollectionKind, items: I) -> Result<Value, BindError>
where
    T: WireEncode + 'a,
    I: ExactSizeIterator<Item = &'a T>,
{
    let mut collection = Collection::with_capacity(kind, items.len());
    for item in items {
        collection.append(item.to_wire()?)?;
    }
    Ok(Value::Collection(collection))
}

fn map_to_wire<'a, K, V, I>(entries: I) -> Result<Value, BindError>
where
    K: WireEncode + 'a,
    V: WireEncode + 'a,
    I: ExactSizeIterator<Item = (&'a K, &'a V)>,
{
    let mut collection = Collection::with_capacity(CollectionKind::Map, entries.len());
    for (key, value) in entries {
        collection.append(key.to_wire()?)?;
        collection.append(value.to_wire()?)?;
    }
    Ok(Value::Collection(collection))
}

macro_rules! sequence_codec {
    ($coll:ident, $insert:ident, $kind:expr, [$($bound:tt)*]) => {
        impl<T: WireDecode + Default $($bound)*> WireDecode for $coll<T> {
            fn extract(&mut self, value: &Value) -> bool {
                self.clear();
                let Some(items) = sequence_items(value) else {
                    return false;
                };
                for item in items {
                    let mut element = T::default();
                    if !element.extract(item) {
                        return false;
                    }
                    self.$insert(element);
                }
                true
            }

            fn reset(&mut self) {
                self.clear();
            }
        }

        impl<T: WireEncode $($bound)*> WireEncode for $coll<T> {
            fn to_wire(&self) -> Result<Value, BindError> {
                sequence_to_wire($kind, self.iter())
            }
        }
    };
}

sequence_codec!(Vec, push, CollectionKind::List, []);
sequence_codec!(VecDeque, push_back, CollectionKind::List, []);
sequence_codec!(BTreeSet, insert, CollectionKind::Set, [+ Ord]);
sequence_codec!(HashSet, insert, CollectionKind::Set, [+ Eq + Hash]);

macro_rules! map_codec {
    ($coll:ident, [$($bound:tt)*]) => {
        impl<K, V> WireDecode for $coll<K, V>
        where
            K: WireDecode + Default $($bound)*,
            V: WireDecode + Default,
        {
            fn extract(&mut self, value: &Value) -> bool {
                self.clear();
                let Some(items) = map_items(value) else {
                    return false;
                };
                let mut stream = items.iter();
                loop {
                    match (stream.next(), stream.next()) {
                        (None, _) => return true,
                        (Some(_), None) => return false,
                        (Some(k), Some(v)) => {
                            let mut key = K::default();
                            let mut val = V::default();
                            if !key.extract(k) || !val.extract(v) {
                                return false;
                            }
                            self.insert(key, val);
                        }
                    }
                }
            }

            fn reset(&mut self) {
                self.clear();
            }
        }

        impl<K: WireEncode $($bound)*, V: WireEncode> WireEncode for $coll<K, V> {
            fn to_wire(&self) -> Result<Value, BindError> {
                map_to_wire(self.iter())
            }
        }
    };
}

map_codec!(BTreeMap, [+ Ord]);
map_codec!(HashMap, [+ Eq + Hash]);
