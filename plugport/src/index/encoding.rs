//! Sort-order-preserving key encoding.
//!
//! The keyspace uses three disjoint prefixes:
//!
//! - Document row: `doc:<collection>:<id>` holding the serialized document.
//! - Index row: `idx:<collection>:<field>:<encodedValue><US><id>` holding a
//!   one-byte sentinel; `<US>` is the Unit Separator byte `0x1F`, which can
//!   appear in neither a value encoding nor a field name.
//! - Metadata row: `meta:collection:<name>` holding serialized metadata.
//!
//! The colons separating the fixed tokens are positional: parsers locate the
//! first three colons by scan and treat everything after the third as
//! `<encodedValue><US><id>`. Collection and field names exclude `:` so the
//! split is unambiguous; within the tail the last `0x1F` splits value from id.
//!
//! Value encodings begin with a one-byte type tag (`0` null, `1` boolean,
//! `2` number, `3` string, `4` date) followed by `:` and the payload, so
//! lexicographic order of encodings gives cross-type order by tag first and
//! payload second.

use crate::common::constants::{
    DOC_PREFIX, INDEX_PREFIX, KEY_UPPER_BOUND, MAX_INDEX_STRING_LENGTH, META_COLLECTION_PREFIX,
    UNIT_SEPARATOR,
};
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};

/// Encodes a value into its sort-preserving representation.
///
/// Arrays and nested documents fall back to their deterministic
/// stringification and encode as strings, subject to the same length cap.
///
/// # Errors
/// [`ErrorKind::BadValue`] for strings longer than the index cap and for
/// pre-epoch dates.
pub fn encode_value(value: &Value) -> PlugPortResult<String> {
    match value {
        Value::Null => Ok("0:".to_string()),
        Value::Bool(false) => Ok("1:0".to_string()),
        Value::Bool(true) => Ok("1:1".to_string()),
        Value::Int(n) => Ok(encode_number(*n as f64)),
        Value::Double(n) => Ok(encode_number(*n)),
        Value::String(s) => encode_string(s),
        Value::Date(ms) => {
            if *ms < 0 {
                log::error!("Cannot index pre-epoch date: {}", ms);
                return Err(PlugPortError::new(
                    &format!("Pre-epoch dates are unsupported for indexing: {}", ms),
                    ErrorKind::BadValue,
                ));
            }
            Ok(format!("4:{:016x}", *ms as u64))
        }
        Value::Array(_) | Value::Document(_) => encode_string(&value.to_string()),
    }
}

fn encode_string(s: &str) -> PlugPortResult<String> {
    if s.len() > MAX_INDEX_STRING_LENGTH {
        log::error!("Indexed string length {} exceeds cap", s.len());
        return Err(PlugPortError::new(
            &format!(
                "Indexed string of {} bytes exceeds the {} byte limit",
                s.len(),
                MAX_INDEX_STRING_LENGTH
            ),
            ErrorKind::BadValue,
        ));
    }
    Ok(format!("3:{}", s))
}

/// Encodes a double such that for any finite `a < b`,
/// `encode_number(a) < encode_number(b)` lexicographically.
///
/// Finite values use the IEEE-754 order-preserving transform: write the
/// 64-bit big-endian representation, set the sign bit when the number is
/// non-negative (`-0.0` is normalized to `+0.0` first), flip all 64 bits when
/// negative, and render as 16 lowercase hex characters. Non-finites use fixed
/// sentinels; their placement relative to finite encodings is pinned by the
/// tests below.
pub fn encode_number(n: f64) -> String {
    if n.is_nan() {
        return "2:N".to_string();
    }
    if n == f64::INFINITY {
        return "2:Z".to_string();
    }
    if n == f64::NEG_INFINITY {
        return "2:A".to_string();
    }

    let mut bits = n.to_bits();
    if n == 0.0 {
        // treat the sign bit of -0.0 as positive
        bits = 0;
    }
    let ordered = if bits >> 63 == 0 {
        bits | (1u64 << 63)
    } else {
        !bits
    };
    format!("2:{:016x}", ordered)
}

/// Builds the key of a document row.
pub fn document_key(collection: &str, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(DOC_PREFIX.len() + collection.len() + 1 + id.len());
    key.extend_from_slice(DOC_PREFIX.as_bytes());
    key.extend_from_slice(collection.as_bytes());
    key.push(b':');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Builds the prefix covering every document row of a collection.
pub fn document_prefix(collection: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(DOC_PREFIX.len() + collection.len() + 1);
    key.extend_from_slice(DOC_PREFIX.as_bytes());
    key.extend_from_slice(collection.as_bytes());
    key.push(b':');
    key
}

/// Builds the prefix covering every row of one index:
/// `idx:<collection>:<field>:`.
pub fn index_prefix(collection: &str, field: &str) -> Vec<u8> {
    let mut key =
        Vec::with_capacity(INDEX_PREFIX.len() + collection.len() + 1 + field.len() + 1);
    key.extend_from_slice(INDEX_PREFIX.as_bytes());
    key.extend_from_slice(collection.as_bytes());
    key.push(b':');
    key.extend_from_slice(field.as_bytes());
    key.push(b':');
    key
}

/// Builds the prefix covering every index row of a collection, across all of
/// its indexes: `idx:<collection>:`.
pub fn collection_index_prefix(collection: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(INDEX_PREFIX.len() + collection.len() + 1);
    key.extend_from_slice(INDEX_PREFIX.as_bytes());
    key.extend_from_slice(collection.as_bytes());
    key.push(b':');
    key
}

/// Builds a full index row key: `idx:<collection>:<field>:<encoded><US><id>`.
pub fn index_row_key(collection: &str, field: &str, encoded_value: &str, id: &str) -> Vec<u8> {
    let mut key = index_prefix(collection, field);
    key.extend_from_slice(encoded_value.as_bytes());
    key.push(UNIT_SEPARATOR);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Builds the key of a collection metadata row.
pub fn metadata_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(META_COLLECTION_PREFIX.len() + name.len());
    key.extend_from_slice(META_COLLECTION_PREFIX.as_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

/// Splits an index key into its encoded value and document id.
///
/// Locates the third `:` from the left; the tail is `<encoded><US><id>` and
/// the last `0x1F` in the tail splits it. Malformed keys yield `None`.
pub fn decode_index_key(key: &[u8]) -> Option<(Vec<u8>, String)> {
    let mut colons = 0usize;
    let mut tail_start = None;
    for (i, byte) in key.iter().enumerate() {
        if *byte == b':' {
            colons += 1;
            if colons == 3 {
                tail_start = Some(i + 1);
                break;
            }
        }
    }
    let tail = &key[tail_start?..];
    let split = tail.iter().rposition(|b| *b == UNIT_SEPARATOR)?;
    let encoded = tail[..split].to_vec();
    let id = String::from_utf8(tail[split + 1..].to_vec()).ok()?;
    Some((encoded, id))
}

/// Comparison operators a single index scan can serve.
#[derive(Debug, Clone, Default)]
pub struct RangeOperators {
    pub eq: Option<Value>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl RangeOperators {
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
    }
}

/// An inclusive start key and exclusive end key bracketing every index row
/// matching the operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

/// Computes the `[start, end)` scan range over an index for the given
/// operators. An equality bracket wins over range bounds; open bounds default
/// to the full index prefix.
pub fn compute_index_range(
    collection: &str,
    field: &str,
    operators: &RangeOperators,
) -> PlugPortResult<IndexRange> {
    let prefix = index_prefix(collection, field);

    if let Some(value) = &operators.eq {
        let encoded = encode_value(value)?;
        let mut start = prefix.clone();
        start.extend_from_slice(encoded.as_bytes());
        start.push(UNIT_SEPARATOR);
        let mut end = start.clone();
        end.push(KEY_UPPER_BOUND);
        return Ok(IndexRange { start, end });
    }

    let mut start = prefix.clone();
    if let Some(value) = &operators.gte {
        let encoded = encode_value(value)?;
        start = prefix.clone();
        start.extend_from_slice(encoded.as_bytes());
        start.push(UNIT_SEPARATOR);
    }
    if let Some(value) = &operators.gt {
        let encoded = encode_value(value)?;
        start = prefix.clone();
        start.extend_from_slice(encoded.as_bytes());
        start.push(UNIT_SEPARATOR);
        start.push(KEY_UPPER_BOUND);
    }

    let mut end = prefix.clone();
    end.push(KEY_UPPER_BOUND);
    if let Some(value) = &operators.lte {
        let encoded = encode_value(value)?;
        end = prefix.clone();
        end.extend_from_slice(encoded.as_bytes());
        end.push(UNIT_SEPARATOR);
        end.push(KEY_UPPER_BOUND);
    }
    if let Some(value) = &operators.lt {
        let encoded = encode_value(value)?;
        end = prefix.clone();
        end.extend_from_slice(encoded.as_bytes());
        end.push(UNIT_SEPARATOR);
    }

    Ok(IndexRange { start, end })
}
