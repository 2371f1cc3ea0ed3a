//! Column types as declared in table schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{CollectionKind, Value};

/// A declared column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    Int,
    BigInt,
    Counter,
    Float,
    Double,
    Text,
    Blob,
    Uuid,
    TimeUuid,
    Decimal,
    Inet,
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
}

impl ColumnType {
    /// Resolve a scalar type name (case-insensitive). Collection types are
    /// assembled by the parser.
    pub fn from_scalar_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "boolean" => ColumnType::Boolean,
            "int" => ColumnType::Int,
            "bigint" => ColumnType::BigInt,
            "counter" => ColumnType::Counter,
            "float" => ColumnType::Float,
            "double" => ColumnType::Double,
            "text" | "varchar" | "ascii" => ColumnType::Text,
            "blob" => ColumnType::Blob,
            "uuid" => ColumnType::Uuid,
            "timeuuid" => ColumnType::TimeUuid,
            "decimal" => ColumnType::Decimal,
            "inet" => ColumnType::Inet,
            _ => return None,
        };
        Some(ty)
    }

    /// Collection shape, if this is a collection type.
    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            ColumnType::List(_) => Some(CollectionKind::List),
            ColumnType::Set(_) => Some(CollectionKind::Set),
            ColumnType::Map(_, _) => Some(CollectionKind::Map),
            _ => None,
        }
    }

    /// Check whether a non-null wire value has the shape this column stores.
    ///
    /// Element types of collections are checked recursively. `timeuuid`
    /// columns additionally require a version 1 identifier.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnType::Boolean, Value::Boolean(_)) => true,
            (ColumnType::Int, Value::Int(_)) => true,
            (ColumnType::BigInt | ColumnType::Counter, Value::BigInt(_)) => true,
            (ColumnType::Float, Value::Float(_)) => true,
            (ColumnType::Double, Value::Double(_)) => true,
            (ColumnType::Text, Value::Text(_)) => true,
            (ColumnType::Blob, Value::Blob(_)) => true,
            (ColumnType::Uuid, Value::Uuid(_) | Value::TimeUuid(_)) => true,
            (ColumnType::TimeUuid, Value::Uuid(b) | Value::TimeUuid(b)) => b[6] >> 4 == 1,
            (ColumnType::Decimal, Value::Decimal(_)) => true,
            (ColumnType::Inet, Value::Inet(_)) => true,
            (ColumnType::List(elem) | ColumnType::Set(elem), Value::Collection(c)) => {
                Some(c.kind()) == self.collection_kind() && c.iter().all(|v| elem.accepts(v))
            }
            (ColumnType::Map(key, val), Value::Collection(c)) => {
                c.kind() == CollectionKind::Map
                    && c.len() % 2 == 0
                    && c.items()
                        .chunks(2)
                        .all(|kv| key.accepts(&kv[0]) && val.accepts(&kv[1]))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => f.write_str("boolean"),
            ColumnType::Int => f.write_str("int"),
            ColumnType::BigInt => f.write_str("bigint"),
            ColumnType::Counter => f.write_str("counter"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::Double => f.write_str("double"),
            ColumnType::Text => f.write_str("text"),
            ColumnType::Blob => f.write_str("blob"),
            ColumnType::Uuid => f.write_str("uuid"),
            ColumnType::TimeUuid => f.write_str("timeuuid"),
            ColumnType::Decimal => f.write_str("decimal"),
            ColumnType::Inet => f.write_str("inet"),
            ColumnType::List(elem) => write!(f, "list<{elem}>"),
            ColumnType::Set(elem) => write!(f, "set<{elem}>"),
            ColumnType::Map(key, val) => write!(f, "map<{key}, {val}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Collection;

    #[test]
    fn test_scalar_names() {
        assert_eq!(ColumnType::from_scalar_name("VARCHAR"), Some(ColumnType::Text));
        assert_eq!(ColumnType::from_scalar_name("timeuuid"), Some(ColumnType::TimeUuid));
        assert_eq!(ColumnType::from_scalar_name("tinyint"), None);
    }

    #[test]
    fn test_timeuuid_requires_version_one() {
        let mut v1 = [0u8; 16];
        v1[6] = 0x11;
        let mut v4 = [0u8; 16];
        v4[6] = 0x4f;
        assert!(ColumnType::TimeUuid.accepts(&Value::Uuid(v1)));
        assert!(!ColumnType::TimeUuid.accepts(&Value::Uuid(v4)));
        assert!(ColumnType::Uuid.accepts(&Value::Uuid(v4)));
    }

    #[test]
    fn test_collection_acceptance() {
        let map_ty = ColumnType::Map(Box::new(ColumnType::Int), Box::new(ColumnType::Int));
        let map = Collection::from_items(
            CollectionKind::Map,
            vec![Value::Int(1), Value::Int(2)],
        );
        assert!(map_ty.accepts(&Value::Collection(map)));

        let list_ty = ColumnType::List(Box::new(ColumnType::Int));
        let set = Collection::from_items(CollectionKind::Set, vec![Value::Int(1)]);
        assert!(!list_ty.accepts(&Value::Collection(set)));
        assert_eq!(map_ty.to_string(), "map<int, int>");
    }
}
