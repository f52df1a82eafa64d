// keyspace constants
pub const DOC_PREFIX: &str = "doc:";
pub const INDEX_PREFIX: &str = "idx:";
pub const META_COLLECTION_PREFIX: &str = "meta:collection:";
/// Unit Separator byte. Cannot appear inside a value encoding or a field
/// name, so it unambiguously splits `<encodedValue>` from `<id>` in index keys.
pub const UNIT_SEPARATOR: u8 = 0x1F;
/// Upper-bound byte appended to prefixes when computing exclusive scan ends.
pub const KEY_UPPER_BOUND: u8 = 0xFF;
/// Appended to the last seen key to get strictly-after semantics on an
/// inclusive-start scan.
pub const KEY_LOWER_SUCCESSOR: u8 = 0x00;
/// Value stored in every index row; presence of the row is the information.
pub const INDEX_ROW_SENTINEL: &[u8] = b"1";

// document constants
pub const DOC_ID: &str = "_id";
pub const MIN_ID_LENGTH: usize = 1;
pub const MAX_ID_LENGTH: usize = 256;
pub const MAX_DOCUMENT_SIZE: usize = 1024 * 1024;
pub const DANGEROUS_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];
pub const MAX_SANITIZE_DEPTH: usize = 20;

// Compile-time assertion for dangerous keys count
const _: () = {
    const DANGEROUS_KEYS_COUNT: usize = 3;
    const ACTUAL_COUNT: usize = DANGEROUS_KEYS.len();
    const _: [(); 1] = [(); (ACTUAL_COUNT == DANGEROUS_KEYS_COUNT) as usize];
};

// collection constants
pub const MAX_COLLECTION_NAME_LENGTH: usize = 120;
pub const FORBIDDEN_NAME_CHARS: [char; 4] = [':', '/', '\\', '\0'];
pub const SYSTEM_COLLECTION_PREFIX: &str = "system.";
pub const INITIAL_SCHEMA_VERSION: u32 = 1;

// index constants
pub const ID_INDEX_NAME: &str = "_id_";
pub const MAX_INDEX_STRING_LENGTH: usize = 1024;

// scan and query limits
pub const SCAN_CHUNK_SIZE: usize = 5000;
pub const DEFAULT_FIND_LIMIT: usize = 1000;
pub const MAX_FIND_LIMIT: usize = 5000;
pub const SORT_EVAL_CAP: usize = 50_000;
pub const BULK_UPDATE_CAP: usize = 50_000;
pub const FILTERED_COUNT_CAP: usize = 100_000;
pub const MAX_IN_ARRAY_LENGTH: usize = 2000;

pub const PLUGPORT_VERSION: &str = env!("CARGO_PKG_VERSION");
