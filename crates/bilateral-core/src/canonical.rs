//! Canonical CBOR encoding for transfer records.
//!
//! Both parties hash transfers independently, so the encoding must be
//! byte-for-byte deterministic (RFC 8949 Core Deterministic Encoding):
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, no tags
//!
//! **This encoding is frozen.** Changing it changes every chain hash.

use ciborium::value::{Integer, Value};

use crate::error::{CoreError, Result};
use crate::transfer::Transfer;
use crate::types::PartyId;

/// Transfer field keys (integer keys for compact encoding).
mod keys {
    pub const SENDER: u64 = 0;
    pub const RECEIVER: u64 = 1;
    pub const ASSET_TYPE: u64 = 2;
    pub const AMOUNT: u64 = 3;
}

/// Encode a transfer to canonical CBOR bytes.
pub fn canonical_transfer_bytes(transfer: &Transfer) -> Result<Vec<u8>> {
    let value = transfer_to_cbor_value(transfer);
    encode_cbor_value_canonical(&value)
}

/// Encode a single string as a CBOR text item (length-prefixed).
pub fn canonical_text(s: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(s.len() + 9);
    encode_text(&mut buf, s);
    buf
}

/// Decode a transfer from canonical bytes.
///
/// Rejects input that decodes but would not re-encode to the same bytes,
/// so a counterparty cannot present an alternative encoding of a record.
pub fn decode_transfer(bytes: &[u8]) -> Result<Transfer> {
    let cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(cursor).map_err(|e| CoreError::Decoding(e.to_string()))?;

    let transfer = cbor_value_to_transfer(&value)?;
    if canonical_transfer_bytes(&transfer)? != bytes {
        return Err(CoreError::Decoding("non-canonical transfer encoding".into()));
    }
    Ok(transfer)
}

fn transfer_to_cbor_value(transfer: &Transfer) -> Value {
    Value::Map(vec![
        (
            Value::Integer(keys::SENDER.into()),
            Value::Text(transfer.sender.as_str().to_string()),
        ),
        (
            Value::Integer(keys::RECEIVER.into()),
            Value::Text(transfer.receiver.as_str().to_string()),
        ),
        (
            Value::Integer(keys::ASSET_TYPE.into()),
            Value::Text(transfer.asset_type.clone()),
        ),
        (
            Value::Integer(keys::AMOUNT.into()),
            Value::Integer(transfer.amount.into()),
        ),
    ])
}

fn cbor_value_to_transfer(value: &Value) -> Result<Transfer> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::Decoding("expected map".into())),
    };
    if map.len() != 4 {
        return Err(CoreError::Decoding(format!(
            "expected 4 fields, got {}",
            map.len()
        )));
    }

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| match k {
                Value::Integer(i) => i128::from(*i) == i128::from(key),
                _ => false,
            })
            .map(|(_, v)| v)
    };

    let text = |key: u64, name: &str| -> Result<String> {
        match get(key) {
            Some(Value::Text(s)) => Ok(s.clone()),
            _ => Err(CoreError::Decoding(format!("missing {}", name))),
        }
    };

    let amount = match get(keys::AMOUNT) {
        Some(Value::Integer(i)) => {
            u64::try_from(*i).map_err(|_| CoreError::Decoding("amount out of range".into()))?
        }
        _ => return Err(CoreError::Decoding("missing amount".into())),
    };

    Ok(Transfer {
        sender: PartyId::new(text(keys::SENDER, "sender")?),
        receiver: PartyId::new(text(keys::RECEIVER, "receiver")?),
        asset_type: text(keys::ASSET_TYPE, "asset_type")?,
        amount,
    })
}

/// Encode a CBOR value to canonical bytes.
fn encode_cbor_value_canonical(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::Encoding(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => return Err(CoreError::Encoding("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map with keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(amount: u64) -> Transfer {
        Transfer {
            sender: PartyId::from("alice"),
            receiver: PartyId::from("bob"),
            asset_type: "USD".into(),
            amount,
        }
    }

    #[test]
    fn test_transfer_encoding_deterministic() {
        let t = usd(100);
        assert_eq!(
            canonical_transfer_bytes(&t).unwrap(),
            canonical_transfer_bytes(&t).unwrap()
        );
    }

    #[test]
    fn test_transfer_encoding_layout() {
        let bytes = canonical_transfer_bytes(&usd(100)).unwrap();
        let mut expected = vec![0xa4];
        expected.push(0x00);
        expected.push(0x65);
        expected.extend_from_slice(b"alice");
        expected.push(0x01);
        expected.push(0x63);
        expected.extend_from_slice(b"bob");
        expected.push(0x02);
        expected.push(0x63);
        expected.extend_from_slice(b"USD");
        expected.push(0x03);
        expected.extend_from_slice(&[0x18, 100]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        // naive concatenation would make these collide
        let a = Transfer {
            sender: PartyId::from("ab"),
            receiver: PartyId::from("c"),
            asset_type: "X".into(),
            amount: 1,
        };
        let b = Transfer {
            sender: PartyId::from("a"),
            receiver: PartyId::from("bc"),
            asset_type: "X".into(),
            amount: 1,
        };
        assert_ne!(
            canonical_transfer_bytes(&a).unwrap(),
            canonical_transfer_bytes(&b).unwrap()
        );
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 65535);
        assert_eq!(buf, vec![0x19, 0xff, 0xff]);

        buf.clear();
        encode_uint(&mut buf, 0, u64::MAX);
        assert_eq!(buf[0], 0x1b);
        assert_eq!(buf.len(), 9);

        buf.clear();
        encode_integer(&mut buf, Integer::from(-1i64));
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(3.into()), Value::Integer(30.into())),
            (Value::Integer(0.into()), Value::Integer(0.into())),
        ];
        encode_map_canonical(&mut buf, &entries).unwrap();
        assert_eq!(buf, vec![0xa2, 0x00, 0x00, 0x03, 0x18, 30]);
    }

    #[test]
    fn test_float_is_an_encoding_error() {
        let value = Value::Map(vec![(Value::Integer(0.into()), Value::Float(1.5))]);
        assert!(matches!(
            encode_cbor_value_canonical(&value),
            Err(CoreError::Encoding(_))
        ));
    }

    #[test]
    fn test_decode_canonical_transfer() {
        let t = usd(u64::MAX);
        let bytes = canonical_transfer_bytes(&t).unwrap();
        assert_eq!(decode_transfer(&bytes).unwrap(), t);
    }

    #[test]
    fn test_decode_rejects_non_minimal_integer() {
        let mut bytes = canonical_transfer_bytes(&usd(5)).unwrap();
        // amount 5 re-encoded with a one-byte length extension
        let last = bytes.len() - 1;
        assert_eq!(bytes[last], 0x05);
        bytes[last] = 0x18;
        bytes.push(0x05);
        assert!(matches!(decode_transfer(&bytes), Err(CoreError::Decoding(_))));
    }

    #[test]
    fn test_canonical_text_is_length_prefixed() {
        assert_eq!(canonical_text("bob"), vec![0x63, b'b', b'o', b'b']);
        assert_eq!(canonical_text(""), vec![0x60]);
    }
}
