use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal for long-running operations.
///
/// Every store operation accepts an optional token; operations observe it at
/// chunk boundaries and KV-call boundaries. Once fired the operation returns
/// [`ErrorKind::OperationCancelled`]. No writes are rolled back on
/// cancellation, so partial effects may remain visible, the same property as
/// a crash between an index put and its document put.
///
/// Tokens are cheap clones sharing one flag.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fires the token. All clones observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether the token has been fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns an error if the token has been fired.
    pub fn check(&self) -> PlugPortResult<()> {
        if self.is_cancelled() {
            return Err(PlugPortError::new(
                "Operation cancelled",
                ErrorKind::OperationCancelled,
            ));
        }
        Ok(())
    }
}

/// Checks an optional token, treating `None` as never-cancelled.
pub(crate) fn check_cancelled(token: Option<&CancellationToken>) -> PlugPortResult<()> {
    match token {
        Some(token) => token.check(),
        None => Ok(()),
    }
}
