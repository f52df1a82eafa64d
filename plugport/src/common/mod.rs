pub mod cancel;
pub mod constants;
pub mod document;
pub mod lock;
pub mod value;

pub use cancel::CancellationToken;
pub use constants::*;
pub use document::{normalize, Document};
pub use lock::{LockHandle, LockRegistry};
pub use value::Value;
