use chrono::Utc;
use rand::Rng;

/// Allocates a document id: a 24-character lowercase hex string whose first
/// 8 characters encode the insert-time unix second big-endian and whose
/// remaining 16 characters come from a random source.
///
/// The time prefix keeps ids of one collection roughly insertion-ordered
/// under the `doc:` prefix; the random suffix makes collisions within one
/// second vanishingly unlikely (and the `_id_` unique index catches them).
pub fn generate_document_id() -> String {
    let seconds = Utc::now().timestamp().max(0) as u32;
    let suffix: u64 = rand::thread_rng().gen();
    format!("{:08x}{:016x}", seconds, suffix)
}
