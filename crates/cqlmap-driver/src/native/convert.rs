//! Conversions between driver values and wire values.

use cqlmap_proto::{
    Collection, CollectionKind, ColumnSpec, ColumnType, Consistency, Decimal, DriverError,
    ErrorCode, ResultSet, Value,
};
use scylla::frame::response::result::{CollectionType, ColumnType as CqlType, NativeType};
use scylla::response::query_result::QueryResult;
use scylla::statement::Consistency as CqlConsistency;
use scylla::value::{Counter, CqlDecimal, CqlTimestamp, CqlTimeuuid, CqlValue, CqlVarint, Row};
use uuid::Uuid;

pub(crate) fn consistency(level: Consistency) -> CqlConsistency {
    match level {
        Consistency::Any => CqlConsistency::Any,
        Consistency::One => CqlConsistency::One,
        Consistency::Two => CqlConsistency::Two,
        Consistency::Three => CqlConsistency::Three,
        Consistency::Quorum => CqlConsistency::Quorum,
        Consistency::All => CqlConsistency::All,
        Consistency::LocalQuorum => CqlConsistency::LocalQuorum,
        Consistency::EachQuorum => CqlConsistency::EachQuorum,
        Consistency::Serial => CqlConsistency::Serial,
        Consistency::LocalSerial => CqlConsistency::LocalSerial,
        Consistency::LocalOne => CqlConsistency::LocalOne,
    }
}

/// Collect a driver response into a [`ResultSet`].
pub(crate) fn result_set(result: QueryResult) -> Result<ResultSet, DriverError> {
    if !result.is_rows() {
        return Ok(ResultSet::void());
    }
    let rows = result.into_rows_result().map_err(client_error)?;
    let columns = rows
        .column_specs()
        .iter()
        .map(|spec| Ok(ColumnSpec::new(spec.name(), column_type(spec.typ())?)))
        .collect::<Result<Vec<_>, DriverError>>()?;

    let mut set = ResultSet::new(columns);
    for row in rows.rows::<Row>().map_err(client_error)? {
        let values = row
            .map_err(client_error)?
            .columns
            .into_iter()
            .map(|column| column.map_or(Ok(Value::Null), from_cql))
            .collect::<Result<Vec<_>, _>>()?;
        set.push_row(values);
    }
    Ok(set)
}

/// Map a column type reported by the server.
///
/// Narrow integer types widen to `int`, `timestamp` reads as `bigint` (epoch
/// millis) and `varint` as a decimal of scale zero.
pub(crate) fn column_type(typ: &CqlType<'_>) -> Result<ColumnType, DriverError> {
    let mapped = match typ {
        CqlType::Native(native) => match native {
            NativeType::Boolean => ColumnType::Boolean,
            NativeType::TinyInt | NativeType::SmallInt | NativeType::Int => ColumnType::Int,
            NativeType::BigInt | NativeType::Timestamp => ColumnType::BigInt,
            NativeType::Counter => ColumnType::Counter,
            NativeType::Float => ColumnType::Float,
            NativeType::Double => ColumnType::Double,
            NativeType::Ascii | NativeType::Text => ColumnType::Text,
            NativeType::Blob => ColumnType::Blob,
            NativeType::Uuid => ColumnType::Uuid,
            NativeType::Timeuuid => ColumnType::TimeUuid,
            NativeType::Decimal | NativeType::Varint => ColumnType::Decimal,
            NativeType::Inet => ColumnType::Inet,
            _ => return Err(unsupported(typ)),
        },
        CqlType::Collection { typ: collection, .. } => match collection {
            CollectionType::List(elem) => ColumnType::List(Box::new(column_type(elem)?)),
            CollectionType::Set(elem) => ColumnType::Set(Box::new(column_type(elem)?)),
            CollectionType::Map(key, val) => {
                ColumnType::Map(Box::new(column_type(key)?), Box::new(column_type(val)?))
            }
            _ => return Err(unsupported(typ)),
        },
        _ => return Err(unsupported(typ)),
    };
    Ok(mapped)
}

/// Convert a non-null driver value.
pub(crate) fn from_cql(value: CqlValue) -> Result<Value, DriverError> {
    let converted = match value {
        CqlValue::Empty => Value::Null,
        CqlValue::Boolean(b) => Value::Boolean(b),
        CqlValue::TinyInt(v) => Value::Int(v.into()),
        CqlValue::SmallInt(v) => Value::Int(v.into()),
        CqlValue::Int(v) => Value::Int(v),
        CqlValue::BigInt(v) => Value::BigInt(v),
        CqlValue::Counter(Counter(v)) => Value::BigInt(v),
        CqlValue::Timestamp(CqlTimestamp(millis)) => Value::BigInt(millis),
        CqlValue::Float(v) => Value::Float(v),
        CqlValue::Double(v) => Value::Double(v),
        CqlValue::Ascii(s) | CqlValue::Text(s) => Value::Text(s),
        CqlValue::Blob(bytes) => Value::Blob(bytes),
        CqlValue::Uuid(id) => Value::Uuid(id.into_bytes()),
        CqlValue::Timeuuid(id) => Value::TimeUuid(Uuid::from(id).into_bytes()),
        CqlValue::Decimal(d) => {
            let (unscaled, scale) = d.as_signed_be_bytes_slice_and_exponent();
            Value::Decimal(Decimal::from_bytes(unscaled.to_vec(), scale))
        }
        CqlValue::Varint(v) => {
            Value::Decimal(Decimal::from_bytes(v.as_signed_bytes_be_slice().to_vec(), 0))
        }
        CqlValue::Inet(addr) => Value::Inet(addr),
        CqlValue::List(items) => collection(CollectionKind::List, items)?,
        CqlValue::Set(items) => collection(CollectionKind::Set, items)?,
        CqlValue::Map(entries) => collection(
            CollectionKind::Map,
            entries.into_iter().flat_map(|(k, v)| [k, v]).collect(),
        )?,
        other => {
            return Err(DriverError::new(
                ErrorCode::ClientInternal,
                format!("unsupported value in result: {:?}", other),
            ))
        }
    };
    Ok(converted)
}

fn collection(kind: CollectionKind, items: Vec<CqlValue>) -> Result<Value, DriverError> {
    let items = items
        .into_iter()
        .map(from_cql)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Collection(Collection::from_items(kind, items)))
}

/// Convert a bound value for a parameter of type `typ`. Null binds as `None`.
pub(crate) fn to_cql(value: Value, typ: &CqlType<'_>) -> Result<Option<CqlValue>, DriverError> {
    if value.is_null() {
        return Ok(None);
    }
    let found = value.type_name();
    let converted = match (typ, value) {
        (CqlType::Native(native), value) => native_to_cql(native, value),
        (CqlType::Collection { typ: shape, .. }, Value::Collection(c)) => {
            collection_to_cql(shape, c)?
        }
        _ => None,
    };
    converted
        .map(Some)
        .ok_or_else(|| mismatch(found, typ))
}

fn native_to_cql(native: &NativeType, value: Value) -> Option<CqlValue> {
    let converted = match (native, value) {
        (NativeType::Boolean, Value::Boolean(b)) => CqlValue::Boolean(b),
        (NativeType::TinyInt, Value::Int(v)) => CqlValue::TinyInt(i8::try_from(v).ok()?),
        (NativeType::SmallInt, Value::Int(v)) => CqlValue::SmallInt(i16::try_from(v).ok()?),
        (NativeType::Int, Value::Int(v)) => CqlValue::Int(v),
        (NativeType::BigInt, Value::BigInt(v)) => CqlValue::BigInt(v),
        (NativeType::Counter, Value::BigInt(v)) => CqlValue::Counter(Counter(v)),
        (NativeType::Timestamp, Value::BigInt(v)) => CqlValue::Timestamp(CqlTimestamp(v)),
        (NativeType::Float, Value::Float(v)) => CqlValue::Float(v),
        (NativeType::Double, Value::Double(v)) => CqlValue::Double(v),
        (NativeType::Ascii, Value::Text(s)) => CqlValue::Ascii(s),
        (NativeType::Text, Value::Text(s)) => CqlValue::Text(s),
        (NativeType::Blob, Value::Blob(bytes)) => CqlValue::Blob(bytes),
        (NativeType::Uuid, Value::Uuid(b) | Value::TimeUuid(b)) => {
            CqlValue::Uuid(Uuid::from_bytes(b))
        }
        (NativeType::Timeuuid, Value::Uuid(b) | Value::TimeUuid(b)) if b[6] >> 4 == 1 => {
            CqlValue::Timeuuid(CqlTimeuuid::from(Uuid::from_bytes(b)))
        }
        (NativeType::Decimal, Value::Decimal(d)) => CqlValue::Decimal(
            CqlDecimal::from_signed_be_bytes_and_exponent(d.unscaled_bytes().to_vec(), d.scale()),
        ),
        (NativeType::Varint, Value::Decimal(d)) if d.scale() == 0 => {
            CqlValue::Varint(CqlVarint::from_signed_bytes_be(d.unscaled_bytes().to_vec()))
        }
        (NativeType::Inet, Value::Inet(addr)) => CqlValue::Inet(addr),
        _ => return None,
    };
    Some(converted)
}

fn collection_to_cql(
    shape: &CollectionType<'_>,
    collection: Collection,
) -> Result<Option<CqlValue>, DriverError> {
    let kind = collection.kind();
    let converted = match (shape, kind) {
        (CollectionType::List(elem), CollectionKind::List) => {
            CqlValue::List(elements(collection.into_items(), elem)?)
        }
        (CollectionType::Set(elem), CollectionKind::Set) => {
            CqlValue::Set(elements(collection.into_items(), elem)?)
        }
        (CollectionType::Map(key, val), CollectionKind::Map) => {
            let mut entries = Vec::with_capacity(collection.len() / 2);
            let mut items = collection.into_items().into_iter();
            while let Some(k) = items.next() {
                let v = items.next().ok_or_else(|| {
                    DriverError::invalid("map value missing for the last key")
                })?;
                entries.push((element(k, key)?, element(v, val)?));
            }
            CqlValue::Map(entries)
        }
        _ => return Ok(None),
    };
    Ok(Some(converted))
}

fn elements(items: Vec<Value>, typ: &CqlType<'_>) -> Result<Vec<CqlValue>, DriverError> {
    items.into_iter().map(|item| element(item, typ)).collect()
}

fn element(item: Value, typ: &CqlType<'_>) -> Result<CqlValue, DriverError> {
    to_cql(item, typ)?.ok_or_else(|| DriverError::invalid("collection elements cannot be null"))
}

fn mismatch(found: &str, typ: &CqlType<'_>) -> DriverError {
    DriverError::invalid(format!(
        "Invalid {} value for parameter of type {:?}",
        found, typ
    ))
}

fn unsupported(typ: &CqlType<'_>) -> DriverError {
    DriverError::new(
        ErrorCode::ClientInternal,
        format!("unsupported column type {:?}", typ),
    )
}

fn client_error(e: impl std::fmt::Display) -> DriverError {
    DriverError::new(ErrorCode::ClientInternal, e.to_string())
}
