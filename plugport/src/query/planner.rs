use crate::common::document::Document;
use crate::common::value::Value;
use crate::errors::PlugPortResult;
use crate::index::encoding::{compute_index_range, IndexRange, RangeOperators};
use crate::index::IndexDescriptor;

/// The scan a plan drives against the substrate.
#[derive(Debug, Clone)]
pub enum ScanPlan {
    /// Iterate every document row of the collection.
    CollectionScan,
    /// Iterate one index between the computed key range.
    IndexScan {
        field: String,
        index_name: String,
        range: IndexRange,
    },
}

/// Planner output: the chosen scan, whether the residual filter must be
/// re-evaluated against each candidate, and an informational cost estimate.
#[derive(Debug, Clone)]
pub struct FindPlan {
    pub scan: ScanPlan,
    pub needs_post_filter: bool,
    pub cost_estimate: f64,
}

impl FindPlan {
    pub fn is_index_scan(&self) -> bool {
        matches!(self.scan, ScanPlan::IndexScan { .. })
    }
}

/// Chooses between an index scan and a collection scan for a filter.
///
/// A single-field index is always a safe lower bound on selectivity; complex
/// planning (multi-index intersection, compound keys) is out of scope. Filter
/// entries are inspected in insertion order and the first indexed field with
/// an equality or range condition wins. `$and`/`$or` sub-filters are searched
/// recursively when no top-level entry qualifies, with the post-filter forced
/// on since the index scan bounds only one branch.
///
/// Dotted field paths are never selected for index scans; they are handled by
/// residual evaluation only.
pub fn create_find_plan(
    collection: &str,
    filter: &Document,
    indexes: &[IndexDescriptor],
    document_count: u64,
) -> PlugPortResult<FindPlan> {
    if filter.is_empty() {
        return Ok(FindPlan {
            scan: ScanPlan::CollectionScan,
            needs_post_filter: false,
            cost_estimate: document_count as f64,
        });
    }

    for (key, condition) in filter.iter() {
        if key.starts_with('$') {
            continue;
        }
        let Some(descriptor) = indexes.iter().find(|d| &d.field == key) else {
            continue;
        };

        match condition {
            Value::Document(spec) => {
                let (operators, has_other_operators) = extract_range_operators(spec);
                if operators.is_empty() {
                    // operator object without a range condition, or a literal
                    // nested document; neither bounds an index scan
                    continue;
                }
                let range = compute_index_range(collection, key, &operators)?;
                let needs_post_filter = has_other_operators || filter.len() > 1;
                return Ok(index_scan_plan(descriptor, range, needs_post_filter, document_count));
            }
            Value::Array(_) => continue,
            // null matches absent fields too, which have no index rows
            Value::Null => continue,
            scalar => {
                let operators = RangeOperators {
                    eq: Some(scalar.clone()),
                    ..Default::default()
                };
                let range = compute_index_range(collection, key, &operators)?;
                let needs_post_filter = filter.len() > 1;
                return Ok(index_scan_plan(descriptor, range, needs_post_filter, document_count));
            }
        }
    }

    for logical in ["$and", "$or"] {
        if let Some(Value::Array(sub_filters)) = filter.get(logical) {
            for sub in sub_filters {
                let Value::Document(sub_filter) = sub else {
                    continue;
                };
                let sub_plan = create_find_plan(collection, sub_filter, indexes, document_count)?;
                if sub_plan.is_index_scan() {
                    // the scan bounds only one branch; everything else must be
                    // post-filtered against each candidate
                    return Ok(FindPlan {
                        scan: sub_plan.scan,
                        needs_post_filter: true,
                        cost_estimate: sub_plan.cost_estimate,
                    });
                }
            }
        }
    }

    Ok(FindPlan {
        scan: ScanPlan::CollectionScan,
        needs_post_filter: true,
        cost_estimate: document_count as f64,
    })
}

fn index_scan_plan(
    descriptor: &IndexDescriptor,
    range: IndexRange,
    needs_post_filter: bool,
    document_count: u64,
) -> FindPlan {
    FindPlan {
        scan: ScanPlan::IndexScan {
            field: descriptor.field.clone(),
            index_name: descriptor.name.clone(),
            range,
        },
        needs_post_filter,
        cost_estimate: (document_count as f64 / 10.0).max(1.0),
    }
}

/// Splits an operator object into the range operators an index scan can
/// serve and a flag for any other operators present (`$ne`, `$in`, ...),
/// which force residual evaluation.
fn extract_range_operators(spec: &Document) -> (RangeOperators, bool) {
    let mut operators = RangeOperators::default();
    let mut has_other = false;
    for (op, value) in spec.iter() {
        match op.as_str() {
            "$eq" => operators.eq = Some(value.clone()),
            "$gt" => operators.gt = Some(value.clone()),
            "$gte" => operators.gte = Some(value.clone()),
            "$lt" => operators.lt = Some(value.clone()),
            "$lte" => operators.lte = Some(value.clone()),
            _ => has_other = true,
        }
    }
    (operators, has_other)
}
