//! Turns literals and bound values into typed column values.

use std::net::IpAddr;

use cqlmap_lang::Term;
use cqlmap_proto::{Collection, CollectionKind, ColumnType, Decimal, DriverError, Value};

use super::key::encode_key;

/// Resolve a term against the column type it is assigned to or compared with.
pub(crate) fn term_to_value(
    term: &Term,
    ty: &ColumnType,
    params: &[Value],
) -> Result<Value, DriverError> {
    let value = match (term, ty) {
        (Term::Null, _) => Value::Null,
        (Term::Marker(index), _) => {
            let bound = params.get(*index).cloned().ok_or_else(|| {
                DriverError::invalid(format!("no value bound for marker {}", index))
            })?;
            if !ty.accepts(&bound) {
                return Err(mismatch(bound.type_name(), ty));
            }
            return Ok(normalize(bound, ty));
        }
        (Term::Bool(b), ColumnType::Boolean) => Value::Boolean(*b),
        (Term::Int(i), ColumnType::Int) => Value::Int(
            i32::try_from(*i)
                .map_err(|_| DriverError::invalid(format!("{} is out of range for int", i)))?,
        ),
        (Term::Int(i), ColumnType::BigInt | ColumnType::Counter) => Value::BigInt(*i),
        (Term::Int(i), ColumnType::Float) => Value::Float(*i as f32),
        (Term::Int(i), ColumnType::Double) => Value::Double(*i as f64),
        (Term::Int(i), ColumnType::Decimal) => Value::Decimal(Decimal::new(*i as i128, 0)),
        (Term::Float(text), ColumnType::Float) => Value::Float(parse_float(text)?),
        (Term::Float(text), ColumnType::Double) => Value::Double(parse_float(text)?),
        (Term::Float(text), ColumnType::Decimal) => Value::Decimal(
            text.parse::<Decimal>()
                .map_err(|e| DriverError::invalid(e.to_string()))?,
        ),
        (Term::Text(s), ColumnType::Text) => Value::Text(s.clone()),
        (Term::Text(s), ColumnType::Inet) => Value::Inet(
            s.parse::<IpAddr>()
                .map_err(|_| DriverError::invalid(format!("Unable to make inet address from '{}'", s)))?,
        ),
        (Term::Uuid(u), ColumnType::Uuid) => Value::Uuid(*u),
        (Term::Uuid(u), ColumnType::TimeUuid) => {
            if u[6] >> 4 != 1 {
                return Err(DriverError::invalid("Unsupported UUID for timeuuid: must be version 1"));
            }
            Value::TimeUuid(*u)
        }
        (Term::Blob(b), ColumnType::Blob) => Value::Blob(b.clone()),
        (Term::List(items), ColumnType::List(elem)) => {
            collection(CollectionKind::List, items.iter().map(|t| &t.value), elem, params)?
        }
        (Term::Set(items), ColumnType::Set(elem)) => {
            let set = collection(CollectionKind::Set, items.iter().map(|t| &t.value), elem, params)?;
            normalize(set, ty)
        }
        (Term::Set(items), ColumnType::Map(_, _)) if items.is_empty() => {
            Value::Collection(Collection::new(CollectionKind::Map))
        }
        (Term::Map(entries), ColumnType::Map(key_ty, val_ty)) => {
            let mut items = Vec::with_capacity(entries.len() * 2);
            for (k, v) in entries {
                items.push(element(&k.value, key_ty, params)?);
                items.push(element(&v.value, val_ty, params)?);
            }
            normalize(
                Value::Collection(Collection::from_items(CollectionKind::Map, items)),
                ty,
            )
        }
        (other, _) => return Err(mismatch(term_name(other), ty)),
    };
    Ok(value)
}

fn collection<'a>(
    kind: CollectionKind,
    terms: impl Iterator<Item = &'a Term>,
    elem: &ColumnType,
    params: &[Value],
) -> Result<Value, DriverError> {
    let items = terms
        .map(|t| element(t, elem, params))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Collection(Collection::from_items(kind, items)))
}

fn element(term: &Term, ty: &ColumnType, params: &[Value]) -> Result<Value, DriverError> {
    let value = term_to_value(term, ty, params)?;
    if value.is_null() {
        return Err(DriverError::invalid("null is not supported inside collections"));
    }
    Ok(value)
}

/// Bring an accepted value into the stored form for its column type: uuids in
/// `timeuuid` columns become `TimeUuid`, sets are sorted and de-duplicated, map
/// entries are sorted by key with the last duplicate winning.
pub(crate) fn normalize(value: Value, ty: &ColumnType) -> Value {
    match (value, ty) {
        (Value::Uuid(u), ColumnType::TimeUuid) => Value::TimeUuid(u),
        (Value::Collection(c), ColumnType::List(elem)) => {
            let items = c.into_items().into_iter().map(|v| normalize(v, elem)).collect();
            Value::Collection(Collection::from_items(CollectionKind::List, items))
        }
        (Value::Collection(c), ColumnType::Set(elem)) => {
            let mut keyed: Vec<(Vec<u8>, Value)> = c
                .into_items()
                .into_iter()
                .map(|v| normalize(v, elem))
                .map(|v| (encode_key([&v]), v))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            keyed.dedup_by(|a, b| a.0 == b.0);
            let items = keyed.into_iter().map(|(_, v)| v).collect();
            Value::Collection(Collection::from_items(CollectionKind::Set, items))
        }
        (Value::Collection(c), ColumnType::Map(key_ty, val_ty)) => {
            let mut entries: Vec<(Vec<u8>, Value, Value)> = Vec::with_capacity(c.len() / 2);
            let mut stream = c.into_items().into_iter();
            while let (Some(k), Some(v)) = (stream.next(), stream.next()) {
                let k = normalize(k, key_ty);
                entries.push((encode_key([&k]), k, normalize(v, val_ty)));
            }
            // stable sort keeps insertion order among equal keys; keep the last
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut deduped: Vec<(Vec<u8>, Value, Value)> = Vec::with_capacity(entries.len());
            for entry in entries {
                match deduped.last_mut() {
                    Some(last) if last.0 == entry.0 => *last = entry,
                    _ => deduped.push(entry),
                }
            }
            let items = deduped.into_iter().flat_map(|(_, k, v)| [k, v]).collect();
            Value::Collection(Collection::from_items(CollectionKind::Map, items))
        }
        (value, _) => value,
    }
}

fn parse_float<T: std::str::FromStr>(text: &str) -> Result<T, DriverError> {
    text.parse()
        .map_err(|_| DriverError::invalid(format!("invalid float literal {}", text)))
}

fn mismatch(found: &str, ty: &ColumnType) -> DriverError {
    DriverError::invalid(format!("Invalid {} value for column of type {}", found, ty))
}

fn term_name(term: &Term) -> &'static str {
    match term {
        Term::Null => "null",
        Term::Bool(_) => "boolean",
        Term::Int(_) => "integer",
        Term::Float(_) => "float",
        Term::Text(_) => "string",
        Term::Uuid(_) => "uuid",
        Term::Blob(_) => "blob",
        Term::Marker(_) => "bind marker",
        Term::List(_) => "list literal",
        Term::Set(_) => "set literal",
        Term::Map(_) => "map literal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqlmap_lang::Spanned;

    fn spanned(term: Term) -> Spanned<Term> {
        Spanned::new(term, Default::default())
    }

    fn int_items(c: &Value) -> Vec<i32> {
        c.as_collection()
            .unwrap()
            .iter()
            .map(|v| v.as_i32().unwrap())
            .collect()
    }

    #[test]
    fn test_integer_literal_widens_per_column() {
        assert_eq!(term_to_value(&Term::Int(3), &ColumnType::Int, &[]).unwrap(), Value::Int(3));
        assert_eq!(
            term_to_value(&Term::Int(3), &ColumnType::BigInt, &[]).unwrap(),
            Value::BigInt(3)
        );
        assert!(term_to_value(&Term::Int(i64::MAX), &ColumnType::Int, &[]).is_err());
        assert!(term_to_value(&Term::Text("3".into()), &ColumnType::Int, &[]).is_err());
    }

    #[test]
    fn test_timeuuid_literal_must_be_version_one() {
        let mut v4 = [0u8; 16];
        v4[6] = 0x40;
        let err = term_to_value(&Term::Uuid(v4), &ColumnType::TimeUuid, &[]).unwrap_err();
        assert!(err.message.contains("version 1"));

        let mut v1 = [0u8; 16];
        v1[6] = 0x10;
        assert_eq!(
            term_to_value(&Term::Uuid(v1), &ColumnType::TimeUuid, &[]).unwrap(),
            Value::TimeUuid(v1)
        );
    }

    #[test]
    fn test_marker_checks_bound_type() {
        let params = [Value::Text("x".into()), Value::Int(1)];
        assert!(term_to_value(&Term::Marker(0), &ColumnType::Int, &params).is_err());
        assert_eq!(
            term_to_value(&Term::Marker(1), &ColumnType::Int, &params).unwrap(),
            Value::Int(1)
        );
        assert!(term_to_value(&Term::Marker(2), &ColumnType::Int, &params).is_err());
    }

    #[test]
    fn test_set_literal_sorted_and_deduplicated() {
        let term = Term::Set(vec![
            spanned(Term::Int(5)),
            spanned(Term::Int(-1)),
            spanned(Term::Int(5)),
        ]);
        let ty = ColumnType::Set(Box::new(ColumnType::Int));
        let value = term_to_value(&term, &ty, &[]).unwrap();
        assert_eq!(int_items(&value), vec![-1, 5]);
    }

    #[test]
    fn test_map_literal_last_duplicate_wins() {
        let term = Term::Map(vec![
            (spanned(Term::Int(8)), spanned(Term::Int(16))),
            (spanned(Term::Int(1)), spanned(Term::Int(2))),
            (spanned(Term::Int(8)), spanned(Term::Int(17))),
        ]);
        let ty = ColumnType::Map(Box::new(ColumnType::Int), Box::new(ColumnType::Int));
        let value = term_to_value(&term, &ty, &[]).unwrap();
        assert_eq!(int_items(&value), vec![1, 2, 8, 17]);
    }

    #[test]
    fn test_null_inside_collection_rejected() {
        let term = Term::List(vec![spanned(Term::Int(1)), spanned(Term::Null)]);
        let ty = ColumnType::List(Box::new(ColumnType::Int));
        assert!(term_to_value(&term, &ty, &[]).is_err());
    }

    #[test]
    fn test_inet_from_text() {
        let value = term_to_value(&Term::Text("10.0.0.1".into()), &ColumnType::Inet, &[]).unwrap();
        assert_eq!(value.as_inet(), Some("10.0.0.1".parse().unwrap()));
    }
}
