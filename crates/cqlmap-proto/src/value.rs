//! Wire values carried in bound statements and result rows.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{BindError, InvalidDecimal};

/// A single column value as it travels over the wire.
///
/// `Uuid` and `TimeUuid` share a representation; a driver reports `TimeUuid`
/// for values read from `timeuuid` columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// `boolean`.
    Boolean(bool),
    /// `int`.
    Int(i32),
    /// `bigint` and `counter`.
    BigInt(i64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `text`, `varchar` and `ascii`.
    Text(String),
    /// `blob`.
    Blob(Vec<u8>),
    /// `uuid`.
    Uuid([u8; 16]),
    /// `timeuuid`.
    TimeUuid([u8; 16]),
    /// `decimal`.
    Decimal(Decimal),
    /// `inet`.
    Inet(IpAddr),
    /// `list`, `set` and `map`.
    Collection(Collection),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short wire type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Uuid(_) => "uuid",
            Value::TimeUuid(_) => "timeuuid",
            Value::Decimal(_) => "decimal",
            Value::Inet(_) => "inet",
            Value::Collection(c) => c.kind().as_str(),
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as UUID bytes, from either uuid flavour.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) | Value::TimeUuid(u) => Some(u),
            _ => None,
        }
    }

    /// Try to get as decimal.
    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    /// Try to get as network address.
    pub fn as_inet(&self) -> Option<IpAddr> {
        match self {
            Value::Inet(ip) => Some(*ip),
            _ => None,
        }
    }

    /// Try to get as collection.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }
}

/// The three collection shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Set,
    Map,
}

impl CollectionKind {
    /// Lower-case CQL name.
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Set => "set",
            CollectionKind::Map => "map",
        }
    }
}

/// A wire collection.
///
/// Maps are stored as an interleaved stream: key, value, key, value. Elements
/// are appended one at a time and must agree in type with the elements before
/// them (keys with keys, values with values for maps).
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    kind: CollectionKind,
    items: Vec<Value>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(kind: CollectionKind) -> Self {
        Self::with_capacity(kind, 0)
    }

    /// Create an empty collection sized for `capacity` elements.
    ///
    /// For maps the capacity counts entries, not stream items.
    pub fn with_capacity(kind: CollectionKind, capacity: usize) -> Self {
        let slots = match kind {
            CollectionKind::Map => capacity * 2,
            _ => capacity,
        };
        Self {
            kind,
            items: Vec::with_capacity(slots),
        }
    }

    /// Build a collection from already validated items.
    pub fn from_items(kind: CollectionKind, items: Vec<Value>) -> Self {
        Self { kind, items }
    }

    /// Append one element (or one half of a map entry).
    pub fn append(&mut self, value: Value) -> Result<(), BindError> {
        if value.is_null() {
            return Err(BindError::NullElement);
        }
        let stride = match self.kind {
            CollectionKind::Map => 2,
            _ => 1,
        };
        if self.items.len() >= stride {
            let peer = &self.items[self.items.len() - stride];
            if !same_wire_type(peer, &value) {
                return Err(BindError::ElementType {
                    expected: peer.type_name(),
                    found: value.type_name(),
                });
            }
        }
        self.items.push(value);
        Ok(())
    }

    /// Collection shape.
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// The raw item stream.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Consume into the raw item stream.
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    /// Number of items in the stream (twice the entry count for maps).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the collection holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the raw item stream.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

fn same_wire_type(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Uuid(_) | Value::TimeUuid(_), Value::Uuid(_) | Value::TimeUuid(_)) => true,
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

/// Arbitrary-precision decimal: a big-endian two's complement unscaled value
/// and a base-10 scale, `unscaled * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: Vec<u8>,
    scale: i32,
}

impl Decimal {
    /// Create a decimal from an unscaled integer and a scale.
    pub fn new(unscaled: i128, scale: i32) -> Self {
        let bytes = unscaled.to_be_bytes();
        let mut start = 0;
        while start < bytes.len() - 1 {
            let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        Self {
            unscaled: bytes[start..].to_vec(),
            scale,
        }
    }

    /// Create a decimal from raw unscaled bytes as found on the wire.
    pub fn from_bytes(unscaled: Vec<u8>, scale: i32) -> Self {
        if unscaled.is_empty() {
            return Self::new(0, scale);
        }
        Self { unscaled, scale }
    }

    /// Raw unscaled bytes.
    pub fn unscaled_bytes(&self) -> &[u8] {
        &self.unscaled
    }

    /// Base-10 scale.
    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Unscaled value, if it fits in 128 bits.
    pub fn unscaled(&self) -> Option<i128> {
        if self.unscaled.len() > 16 {
            return None;
        }
        let fill = if self.unscaled.first().is_some_and(|b| b & 0x80 != 0) {
            0xff
        } else {
            0x00
        };
        let mut buf = [fill; 16];
        buf[16 - self.unscaled.len()..].copy_from_slice(&self.unscaled);
        Some(i128::from_be_bytes(buf))
    }

    /// Check if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.unscaled.iter().all(|b| *b == 0)
    }
}

/// Largest scale magnitude rendered without an exponent.
const MAX_PLAIN_SCALE: u32 = 64;

impl Default for Decimal {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(unscaled) = self.unscaled() else {
            return write!(f, "0x{:02x?}E-{}", self.unscaled, self.scale);
        };
        let sign = if unscaled < 0 { "-" } else { "" };
        let digits = unscaled.unsigned_abs().to_string();
        if self.scale.unsigned_abs() > MAX_PLAIN_SCALE {
            return write!(f, "{sign}{digits}E{}", -i64::from(self.scale));
        }
        if self.scale <= 0 {
            let zeros = "0".repeat(self.scale.unsigned_abs() as usize);
            return write!(f, "{sign}{digits}{zeros}");
        }
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (whole, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{whole}.{frac}")
    }
}

impl FromStr for Decimal {
    type Err = InvalidDecimal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || InvalidDecimal(s.to_string());
        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mut unscaled: i128 = format!("{whole}{frac}").parse().map_err(|_| invalid())?;
        if negative {
            unscaled = -unscaled;
        }
        let scale = i32::try_from(frac.len()).map_err(|_| invalid())?;
        Ok(Self::new(unscaled, scale))
    }
}
