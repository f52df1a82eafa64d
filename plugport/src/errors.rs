use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

/// Error kinds for PlugPort operations.
///
/// Each kind maps to a numeric code from the wire protocol's error-code
/// dictionary via [`ErrorKind::code`], so front ends can translate failures
/// without inspecting messages.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Malformed filter, update spec, projection, forbidden key, or an
    /// exceeded resource limit (`$in` cap, index string cap, sort cap).
    BadValue,
    /// A unique index constraint was violated.
    DuplicateKey,
    /// Attempt to drop the mandatory `_id_` index.
    InvalidLength,
    /// Collection name failed validation.
    InvalidNamespace,
    /// Collection does not exist where one is required.
    NamespaceNotFound,
    /// Index does not exist.
    IndexNotFound,
    /// Document exceeds the configured size limit.
    DocumentTooLarge,
    /// The operation was cancelled via its cancellation token.
    OperationCancelled,
    /// Unexpected failure from the key-value substrate or a bug.
    InternalError,
}

impl ErrorKind {
    /// Returns the protocol error code for this kind.
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::BadValue => 2,
            ErrorKind::DuplicateKey => 11000,
            ErrorKind::InvalidLength => 21,
            ErrorKind::InvalidNamespace => 73,
            ErrorKind::NamespaceNotFound => 26,
            ErrorKind::IndexNotFound => 27,
            ErrorKind::DocumentTooLarge => 10334,
            ErrorKind::OperationCancelled => 11601,
            ErrorKind::InternalError => 1,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::BadValue => write!(f, "BadValue"),
            ErrorKind::DuplicateKey => write!(f, "DuplicateKey"),
            ErrorKind::InvalidLength => write!(f, "InvalidLength"),
            ErrorKind::InvalidNamespace => write!(f, "InvalidNamespace"),
            ErrorKind::NamespaceNotFound => write!(f, "NamespaceNotFound"),
            ErrorKind::IndexNotFound => write!(f, "IndexNotFound"),
            ErrorKind::DocumentTooLarge => write!(f, "DocumentTooLarge"),
            ErrorKind::OperationCancelled => write!(f, "OperationCancelled"),
            ErrorKind::InternalError => write!(f, "InternalError"),
        }
    }
}

/// Custom PlugPort error type.
///
/// `PlugPortError` carries a human-readable message, an [`ErrorKind`], and an
/// optional cause. Errors crossing a layer boundary are wrapped with
/// [`PlugPortError::with_cause`] so the original kind and message survive the
/// promotion.
///
/// # Examples
///
/// ```rust,ignore
/// use plugport::errors::{ErrorKind, PlugPortError, PlugPortResult};
///
/// fn example() -> PlugPortResult<()> {
///     Err(PlugPortError::new("index not found", ErrorKind::IndexNotFound))
/// }
/// ```
#[derive(Clone)]
pub struct PlugPortError {
    message: String,
    kind: ErrorKind,
    cause: Option<Box<PlugPortError>>,
}

impl PlugPortError {
    /// Creates a new `PlugPortError` with the specified message and kind.
    pub fn new(message: &str, kind: ErrorKind) -> Self {
        PlugPortError {
            message: message.to_string(),
            kind,
            cause: None,
        }
    }

    /// Creates a new `PlugPortError` wrapping a cause error.
    ///
    /// The cause is preserved in the chain and surfaced through
    /// [`Error::source`].
    pub fn with_cause(message: &str, kind: ErrorKind, cause: PlugPortError) -> Self {
        PlugPortError {
            message: message.to_string(),
            kind,
            cause: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the protocol error code for this error.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn cause(&self) -> Option<&PlugPortError> {
        self.cause.as_deref()
    }
}

impl Display for PlugPortError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for PlugPortError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "[{}] {}\nCaused by: {:?}", self.kind, self.message, cause),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl Error for PlugPortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for PlugPort operations.
pub type PlugPortResult<T> = Result<T, PlugPortError>;

impl From<serde_json::Error> for PlugPortError {
    fn from(err: serde_json::Error) -> Self {
        PlugPortError::new(
            &format!("Document serialization error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<std::string::FromUtf8Error> for PlugPortError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        PlugPortError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::InternalError,
        )
    }
}
