use crate::common::constants::MAX_IN_ARRAY_LENGTH;
use crate::common::document::Document;
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};
use std::cmp::Ordering;

/// Evaluates a residual filter against a document.
///
/// Top-level entries conjoin: every field condition and every logical
/// operator must hold. Field conditions are either a literal value (deep
/// equality shorthand) or an operator object. Dotted paths descend into
/// nested documents.
pub fn matches(document: &Document, filter: &Document) -> PlugPortResult<bool> {
    for (key, condition) in filter.iter() {
        if key.starts_with('$') {
            if !apply_logical(document, key, condition)? {
                return Ok(false);
            }
        } else {
            let field_value = document.get_path(key);
            if !matches_condition(field_value, condition)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn apply_logical(document: &Document, operator: &str, condition: &Value) -> PlugPortResult<bool> {
    match operator {
        "$and" => {
            let sub_filters = filter_array(condition, "$and")?;
            for sub in sub_filters {
                if !matches(document, sub)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "$or" => {
            let sub_filters = filter_array(condition, "$or")?;
            if sub_filters.is_empty() {
                return Err(PlugPortError::new(
                    "$or requires a non-empty array of filters",
                    ErrorKind::BadValue,
                ));
            }
            for sub in sub_filters {
                if matches(document, sub)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => {
            log::error!("Unknown logical operator in filter: {}", other);
            Err(PlugPortError::new(
                &format!("Unknown top-level operator: {}", other),
                ErrorKind::BadValue,
            ))
        }
    }
}

fn filter_array<'a>(condition: &'a Value, operator: &str) -> PlugPortResult<Vec<&'a Document>> {
    let Some(array) = condition.as_array() else {
        return Err(PlugPortError::new(
            &format!("{} requires an array of filters", operator),
            ErrorKind::BadValue,
        ));
    };
    let mut filters = Vec::with_capacity(array.len());
    for item in array {
        match item.as_document() {
            Some(filter) => filters.push(filter),
            None => {
                return Err(PlugPortError::new(
                    &format!("{} array elements must be filter documents", operator),
                    ErrorKind::BadValue,
                ))
            }
        }
    }
    Ok(filters)
}

fn matches_condition(field_value: Option<&Value>, condition: &Value) -> PlugPortResult<bool> {
    if let Value::Document(spec) = condition {
        let operator_keys = spec.field_names().filter(|k| k.starts_with('$')).count();
        if operator_keys > 0 {
            if operator_keys != spec.len() {
                return Err(PlugPortError::new(
                    "Cannot mix operators and plain fields in one condition",
                    ErrorKind::BadValue,
                ));
            }
            for (operator, target) in spec.iter() {
                if !apply_operator(field_value, operator, target)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    Ok(deep_eq(field_value, condition))
}

/// Deep equality with a missing field treated as null.
fn deep_eq(field_value: Option<&Value>, target: &Value) -> bool {
    match field_value {
        Some(value) => value == target,
        None => target.is_null(),
    }
}

fn apply_operator(
    field_value: Option<&Value>,
    operator: &str,
    target: &Value,
) -> PlugPortResult<bool> {
    match operator {
        "$eq" => Ok(deep_eq(field_value, target)),
        // matches if the field is absent or structurally unequal
        "$ne" => Ok(match field_value {
            Some(value) => value != target,
            None => true,
        }),
        "$gt" | "$gte" | "$lt" | "$lte" => {
            // null and absent values never match a range predicate
            let Some(value) = field_value else {
                return Ok(false);
            };
            if value.is_null() {
                return Ok(false);
            }
            let ordering = compare_for_range(value, target);
            Ok(match operator {
                "$gt" => ordering == Ordering::Greater,
                "$gte" => ordering != Ordering::Less,
                "$lt" => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            })
        }
        "$in" => {
            let candidates = bounded_array(target, "$in")?;
            let value = field_value.unwrap_or(&Value::Null);
            Ok(candidates.iter().any(|candidate| value == candidate))
        }
        "$nin" => {
            let candidates = bounded_array(target, "$nin")?;
            // a missing field counts as matching
            let Some(value) = field_value else {
                return Ok(true);
            };
            Ok(!candidates.iter().any(|candidate| value == candidate))
        }
        "$exists" => Ok(field_value.is_some() ^ target.is_falsy()),
        other => {
            log::error!("Unknown filter operator: {}", other);
            Err(PlugPortError::new(
                &format!("Unknown filter operator: {}", other),
                ErrorKind::BadValue,
            ))
        }
    }
}

fn bounded_array<'a>(target: &'a Value, operator: &str) -> PlugPortResult<&'a Vec<Value>> {
    let Some(array) = target.as_array() else {
        return Err(PlugPortError::new(
            &format!("{} requires an array", operator),
            ErrorKind::BadValue,
        ));
    };
    if array.len() > MAX_IN_ARRAY_LENGTH {
        return Err(PlugPortError::new(
            &format!(
                "{} array of {} elements exceeds the {} element limit",
                operator,
                array.len(),
                MAX_IN_ARRAY_LENGTH
            ),
            ErrorKind::BadValue,
        ));
    }
    Ok(array)
}

/// Compares two values for a range predicate: numerically when both sides
/// coerce to finite numbers, otherwise as strings by code-point order.
///
/// The string fallback mirrors the wire protocol's historical behavior for
/// mismatched types; results for mixed comparisons follow stringification,
/// not any cross-type numeric order.
pub(crate) fn compare_for_range(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        if x.is_finite() && y.is_finite() {
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }
    }
    a.to_string().cmp(&b.to_string())
}
