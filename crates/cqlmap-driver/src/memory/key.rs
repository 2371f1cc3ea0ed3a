//! Order-preserving byte encoding of values.
//!
//! Used for primary keys and for sorting set elements and map keys. Encoded
//! bytes compare the way the values do: integers and floats are big-endian
//! with the sign bit flipped, so lexicographic order matches numeric order.

use cqlmap_proto::Value;

const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_BIGINT: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_DOUBLE: u8 = 5;
const TAG_TEXT: u8 = 6;
const TAG_BLOB: u8 = 7;
const TAG_UUID: u8 = 8;
const TAG_DECIMAL: u8 = 9;
const TAG_INET: u8 = 10;
const TAG_COLLECTION: u8 = 11;

/// Encode a sequence of values, e.g. the primary key columns of a row.
pub fn encode_key<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<u8> {
    let mut buf = Vec::new();
    for value in values {
        encode_value(&mut buf, value);
    }
    buf
}

/// Append one value's encoding to `buf`.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&((*i as u32) ^ (1 << 31)).to_be_bytes());
        }
        Value::BigInt(i) => {
            buf.push(TAG_BIGINT);
            buf.extend_from_slice(&((*i as u64) ^ (1 << 63)).to_be_bytes());
        }
        Value::Float(f) => {
            buf.push(TAG_FLOAT);
            let bits = f.to_bits();
            let ordered = if bits >> 31 == 1 { !bits } else { bits | (1 << 31) };
            buf.extend_from_slice(&ordered.to_be_bytes());
        }
        Value::Double(f) => {
            buf.push(TAG_DOUBLE);
            let bits = f.to_bits();
            let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
            buf.extend_from_slice(&ordered.to_be_bytes());
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            encode_bytes(buf, s.as_bytes());
        }
        Value::Blob(b) => {
            buf.push(TAG_BLOB);
            encode_bytes(buf, b);
        }
        Value::Uuid(u) | Value::TimeUuid(u) => {
            buf.push(TAG_UUID);
            buf.extend_from_slice(u);
        }
        Value::Decimal(d) => {
            buf.push(TAG_DECIMAL);
            buf.extend_from_slice(&d.scale().to_be_bytes());
            encode_bytes(buf, d.unscaled_bytes());
        }
        Value::Inet(ip) => {
            buf.push(TAG_INET);
            match ip {
                std::net::IpAddr::V4(v4) => buf.extend_from_slice(&v4.octets()),
                std::net::IpAddr::V6(v6) => buf.extend_from_slice(&v6.octets()),
            }
        }
        Value::Collection(c) => {
            buf.push(TAG_COLLECTION);
            for item in c.iter() {
                buf.push(1);
                encode_value(buf, item);
            }
            buf.push(0);
        }
    }
}

/// Zero bytes are escaped as `00 ff` and the run is closed with `00 00`, so a
/// shorter string sorts before any string it prefixes.
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    for b in bytes {
        buf.push(*b);
        if *b == 0 {
            buf.push(0xff);
        }
    }
    buf.extend_from_slice(&[0, 0]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(v: Value) -> Vec<u8> {
        encode_key([&v])
    }

    #[test]
    fn test_integer_order() {
        assert!(key(Value::Int(-5)) < key(Value::Int(-1)));
        assert!(key(Value::Int(-1)) < key(Value::Int(0)));
        assert!(key(Value::Int(2)) < key(Value::Int(10)));
        assert!(key(Value::BigInt(i64::MIN)) < key(Value::BigInt(i64::MAX)));
    }

    #[test]
    fn test_float_order() {
        assert!(key(Value::Double(-2.5)) < key(Value::Double(-1.0)));
        assert!(key(Value::Double(-1.0)) < key(Value::Double(0.0)));
        assert!(key(Value::Double(0.5)) < key(Value::Double(3.0)));
        assert!(key(Value::Float(-0.5)) < key(Value::Float(0.25)));
    }

    #[test]
    fn test_text_prefix_order() {
        assert!(key(Value::Text("ab".into())) < key(Value::Text("abc".into())));
        assert!(key(Value::Text("abc".into())) < key(Value::Text("abd".into())));
        assert!(key(Value::Blob(vec![0])) > key(Value::Blob(vec![])));
    }

    #[test]
    fn test_uuid_flavours_encode_alike() {
        assert_eq!(key(Value::Uuid([7; 16])), key(Value::TimeUuid([7; 16])));
    }
}
