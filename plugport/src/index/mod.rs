pub mod encoding;
pub mod manager;

pub use encoding::{IndexRange, RangeOperators};
pub use manager::{IndexManager, IndexWriteBatch};

use crate::common::constants::{DOC_ID, ID_INDEX_NAME};

/// Definition of a secondary index: a named projection of one top-level field
/// onto document ids, optionally enforcing uniqueness.
///
/// Every collection owns an implicit `_id_` index on `_id` that is unique and
/// cannot be dropped. User-created indexes are named `<field>_1`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub field: String,
    pub unique: bool,
}

impl IndexDescriptor {
    /// Creates a descriptor for a user index on the given field.
    pub fn new(field: &str, unique: bool) -> Self {
        IndexDescriptor {
            name: index_name_for(field),
            field: field.to_string(),
            unique,
        }
    }

    /// The implicit unique index on `_id`.
    pub fn id_index() -> Self {
        IndexDescriptor {
            name: ID_INDEX_NAME.to_string(),
            field: DOC_ID.to_string(),
            unique: true,
        }
    }

    /// Whether this is the mandatory `_id_` index.
    pub fn is_id_index(&self) -> bool {
        self.name == ID_INDEX_NAME
    }
}

/// Returns the canonical name of a user index on a field.
pub fn index_name_for(field: &str) -> String {
    format!("{}_1", field)
}
