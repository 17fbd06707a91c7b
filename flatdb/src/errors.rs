use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

/// Error kinds for flatdb operations.
///
/// Each kind describes a specific category of failure, enabling precise
/// error handling at the call site.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// The requested key is not present
    NotFound,
    /// An insert collided with an existing key
    DuplicateKey,
    /// An edit's key does not match the record's own key
    KeyMismatch,
    /// A required input was missing or malformed
    InvalidArgument,

    /// Generic IO error
    IOError,
    /// The backing file was not found
    FileNotFound,
    /// Permission denied for a file operation
    PermissionDenied,
    /// File content does not match the expected layout
    FileCorrupted,
    /// A best-effort rollback after a failed write itself failed
    RollbackFailed,

    /// The store has been closed or destroyed
    StoreClosed,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::KeyMismatch => write!(f, "Key mismatch"),
            ErrorKind::InvalidArgument => write!(f, "Invalid argument"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::FileCorrupted => write!(f, "File corrupted"),
            ErrorKind::RollbackFailed => write!(f, "Rollback failed"),
            ErrorKind::StoreClosed => write!(f, "Store closed"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom flatdb error type.
///
/// `FlatdbError` encapsulates the error message, kind, and optional cause.
/// It supports error chaining and captures a backtrace at construction for
/// debugging.
#[derive(Clone)]
pub struct FlatdbError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<FlatdbError>>,
    backtrace: Backtrace,
}

impl FlatdbError {
    /// Creates a new `FlatdbError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        FlatdbError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Backtrace::new(),
        }
    }

    /// Creates a new `FlatdbError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: FlatdbError) -> Self {
        FlatdbError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Backtrace::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&FlatdbError> {
        self.cause.as_deref()
    }
}

impl Display for FlatdbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for FlatdbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for FlatdbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for flatdb operations.
///
/// All fallible flatdb operations return this type.
pub type FlatdbResult<T> = Result<T, FlatdbError>;

impl From<std::io::Error> for FlatdbError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        FlatdbError::new(&format!("IO error: {}", err), error_kind)
    }
}
