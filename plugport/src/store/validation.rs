use crate::common::constants::{
    DANGEROUS_KEYS, FORBIDDEN_NAME_CHARS, MAX_COLLECTION_NAME_LENGTH, MAX_ID_LENGTH,
    MAX_SANITIZE_DEPTH, MIN_ID_LENGTH, SYSTEM_COLLECTION_PREFIX,
};
use crate::common::document::Document;
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};

/// Validates a collection name against the namespace predicate: non-empty,
/// at most 120 characters, none of `: / \ NUL`, no `..`, not only
/// whitespace, and not reserved under `system.`.
pub fn validate_collection_name(name: &str) -> PlugPortResult<()> {
    if name.is_empty() || name.trim().is_empty() {
        return Err(invalid_namespace(name, "name must not be empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_LENGTH {
        return Err(invalid_namespace(
            name,
            &format!("name exceeds {} characters", MAX_COLLECTION_NAME_LENGTH),
        ));
    }
    if name.chars().any(|c| FORBIDDEN_NAME_CHARS.contains(&c)) {
        return Err(invalid_namespace(name, "name contains a forbidden character"));
    }
    if name.contains("..") {
        return Err(invalid_namespace(name, "name must not contain '..'"));
    }
    if name.starts_with(SYSTEM_COLLECTION_PREFIX) {
        return Err(invalid_namespace(name, "the system. prefix is reserved"));
    }
    Ok(())
}

fn invalid_namespace(name: &str, reason: &str) -> PlugPortError {
    log::error!("Invalid collection name {:?}: {}", name, reason);
    PlugPortError::new(
        &format!("Invalid collection name {:?}: {}", name, reason),
        ErrorKind::InvalidNamespace,
    )
}

/// Validates a field name for index creation: non-empty and free of the
/// keyspace separator.
pub fn validate_index_field(field: &str) -> PlugPortResult<()> {
    if field.is_empty() {
        return Err(PlugPortError::new(
            "Index field name must not be empty",
            ErrorKind::BadValue,
        ));
    }
    if field.contains(':') || field.bytes().any(|b| b == 0x1F) {
        return Err(PlugPortError::new(
            &format!("Index field name {:?} contains a forbidden character", field),
            ErrorKind::BadValue,
        ));
    }
    Ok(())
}

/// Validates an externally supplied `_id`: a string of 1 to 256 characters.
pub fn validate_document_id(value: &Value) -> PlugPortResult<&str> {
    let Some(id) = value.as_string() else {
        return Err(PlugPortError::new(
            &format!("_id must be a string, got {}", value.type_name()),
            ErrorKind::BadValue,
        ));
    };
    if id.len() < MIN_ID_LENGTH || id.len() > MAX_ID_LENGTH {
        return Err(PlugPortError::new(
            &format!(
                "_id length must be between {} and {} characters, got {}",
                MIN_ID_LENGTH,
                MAX_ID_LENGTH,
                id.len()
            ),
            ErrorKind::BadValue,
        ));
    }
    Ok(id)
}

/// Recursively rejects documents carrying keys from the dangerous set
/// (`__proto__`, `constructor`, `prototype`), up to the depth cap.
///
/// Filters, updates, and projections share the document type, so the same
/// pass sanitizes every externally supplied payload.
pub fn sanitize_document(document: &Document) -> PlugPortResult<()> {
    sanitize_at_depth(document, 0)
}

fn sanitize_at_depth(document: &Document, depth: usize) -> PlugPortResult<()> {
    if depth > MAX_SANITIZE_DEPTH {
        return Err(PlugPortError::new(
            &format!("Document nesting exceeds {} levels", MAX_SANITIZE_DEPTH),
            ErrorKind::BadValue,
        ));
    }
    for (key, value) in document.iter() {
        if DANGEROUS_KEYS.contains(&key.as_str()) {
            log::error!("Rejected dangerous key {:?}", key);
            return Err(PlugPortError::new(
                &format!("Key {:?} is not allowed", key),
                ErrorKind::BadValue,
            ));
        }
        sanitize_value(value, depth + 1)?;
    }
    Ok(())
}

fn sanitize_value(value: &Value, depth: usize) -> PlugPortResult<()> {
    if depth > MAX_SANITIZE_DEPTH {
        return Err(PlugPortError::new(
            &format!("Document nesting exceeds {} levels", MAX_SANITIZE_DEPTH),
            ErrorKind::BadValue,
        ));
    }
    match value {
        Value::Document(nested) => sanitize_at_depth(nested, depth),
        Value::Array(items) => {
            for item in items {
                sanitize_value(item, depth + 1)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
