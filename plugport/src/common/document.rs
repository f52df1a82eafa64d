use crate::common::constants::DOC_ID;
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};
use indexmap::IndexMap;
use std::fmt::{Debug, Display, Formatter};

/// Represents a document: an insertion-ordered mapping from field names to
/// [Value]s.
///
/// Every stored document carries a distinguished string field `_id`. If it is
/// absent on insert, the store allocates one.
///
/// Field order is significant: the query planner inspects filter entries in
/// insertion order when choosing an index, so documents (and filters, which
/// share this type) iterate in the order fields were put.
///
/// Nested values are reached with dotted paths through [`Document::get_path`];
/// top-level field names themselves may not be empty.
#[derive(Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Document {
    fields: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            fields: IndexMap::new(),
        }
    }

    /// Checks if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Associates the specified [Value] with the specified top-level field.
    ///
    /// If the field already exists its value is replaced in place, keeping its
    /// original position in the insertion order.
    ///
    /// # Errors
    /// Returns [`ErrorKind::BadValue`] if the field name is empty.
    pub fn put<T: Into<Value>>(&mut self, field: &str, value: T) -> PlugPortResult<()> {
        if field.is_empty() {
            log::error!("Document does not support empty field names");
            return Err(PlugPortError::new(
                "Document does not support empty field names",
                ErrorKind::BadValue,
            ));
        }
        self.fields.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Returns the value of a top-level field, or `None` if absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Resolves a dotted path (`"a.b.c"`) by descending through nested
    /// documents. Returns `None` if any segment is missing or a non-document
    /// value is reached before the last segment.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if !path.contains('.') {
            return self.get(path);
        }

        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let value = current.get(segment)?;
            if segments.peek().is_none() {
                return Some(value);
            }
            current = value.as_document()?;
        }
        None
    }

    /// Removes a top-level field, returning its value if present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Checks whether a top-level field is present.
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Returns the field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Returns the document id, if the `_id` field is present and a string.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(DOC_ID).and_then(|v| v.as_string())
    }

    /// Sets the `_id` field.
    pub fn set_id(&mut self, id: &str) {
        self.fields
            .insert(DOC_ID.to_string(), Value::String(id.to_string()));
    }

    /// Serializes the document to its stored row representation.
    pub fn to_bytes(&self) -> PlugPortResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes a document from a stored row.
    pub fn from_bytes(bytes: &[u8]) -> PlugPortResult<Document> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Returns the serialized size of the document in bytes.
    pub fn byte_size(&self) -> PlugPortResult<usize> {
        Ok(self.to_bytes()?.len())
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Strips surrounding quotes left behind by `stringify!` on string-literal
/// keys in the `doc!` macro.
pub fn normalize(key: &str) -> String {
    key.trim_matches('"').to_string()
}

/// A macro to create a [Document] from key-value pairs.
///
/// Keys may be identifiers or string literals; values may be literals,
/// parenthesized expressions, arrays, or nested `{ ... }` documents.
///
/// # Examples
///
/// ```rust
/// use plugport::doc;
///
/// let simple = doc! {
///     "name": "Alice",
///     "age": 30i64
/// };
///
/// let nested = doc! {
///     "user": {
///         "name": "Charlie",
///         "tags": ["admin", "user"]
///     },
///     "values": [1i64, 2i64, 3i64]
/// };
/// assert_eq!(simple.len(), 2);
/// assert_eq!(nested.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::common::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::common::Document::new();
            $(
                doc.put(&$crate::common::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect("failed to put value in document");
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the `doc!` macro.
/// Handles nested documents, arrays, and expressions.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
