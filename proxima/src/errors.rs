use backtrace::Backtrace;
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for query execution, relation and index operations.
///
/// Each kind describes one category of failure so callers can react to it
/// precisely (for example treating [`ErrorKind::ObjectNotFound`] as a normal
/// lookup miss while [`ErrorKind::IndexCorrupted`] aborts the computation).
///
/// # Examples
///
/// ```rust
/// use proxima::errors::{ErrorKind, ProximaError, ProximaResult};
///
/// fn lookup() -> ProximaResult<()> {
///     Err(ProximaError::new("Object 7 not found", ErrorKind::ObjectNotFound))
/// }
///
/// assert_eq!(lookup().unwrap_err().kind(), &ErrorKind::ObjectNotFound);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Relation errors
    /// No relation of the database satisfies a type restriction
    NoMatchingRelation,
    /// The requested object id is not stored in the relation
    ObjectNotFound,
    /// An id that is already present was inserted again
    DuplicateId,

    // Query construction errors
    /// A query was requested without a distance or similarity function, or
    /// against a relation the database does not own
    ConfigurationError,

    // Operation errors
    /// The operation is not valid in the current state
    InvalidOperation,
    /// The database shape does not support the operation (e.g. mutation of a static store)
    UnsupportedOperation,

    // Validation errors
    /// Generic validation error (malformed bundle, bad settings)
    ValidationError,
    /// A value does not have the dimensionality the relation or index requires
    DimensionalityMismatch,

    // Index errors
    /// Generic indexing error
    IndexingError,
    /// The index structure and the relation it indexes have desynchronized
    IndexCorrupted,

    // Event errors
    /// A listener failed while an event was dispatched
    EventError,

    // Extension errors - allows dependent crates to plug in their own categories
    /// Error from an extension crate (e.g. "Spatial")
    Extension(String),

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NoMatchingRelation => write!(f, "No matching relation"),
            ErrorKind::ObjectNotFound => write!(f, "Object not found"),
            ErrorKind::DuplicateId => write!(f, "Duplicate id"),
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::UnsupportedOperation => write!(f, "Unsupported operation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::DimensionalityMismatch => write!(f, "Dimensionality mismatch"),
            ErrorKind::IndexingError => write!(f, "Indexing error"),
            ErrorKind::IndexCorrupted => write!(f, "Index corrupted"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::Extension(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

impl ErrorKind {
    /// Whether the kind rejects malformed input; dimensionality mismatches
    /// are a refinement of validation errors.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationError | ErrorKind::DimensionalityMismatch
        )
    }
}

/// Error type of the query-execution core.
///
/// `ProximaError` carries a message, a kind, an optional cause and the
/// backtrace captured at construction.
///
/// # Examples
///
/// ```rust
/// use proxima::errors::{ErrorKind, ProximaError};
///
/// let cause = ProximaError::new("Object 3 not found", ErrorKind::ObjectNotFound);
/// let err = ProximaError::new_with_cause("Index insert failed", ErrorKind::IndexingError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct ProximaError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<ProximaError>>,
    backtrace: Arc<RwLock<Backtrace>>,
}

impl ProximaError {
    /// Creates a new `ProximaError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        ProximaError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    /// Creates a new `ProximaError` chained to the error that caused it.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: ProximaError) -> Self {
        ProximaError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&ProximaError> {
        self.cause.as_deref()
    }
}

impl Display for ProximaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for ProximaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for ProximaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for fallible operations of this crate.
pub type ProximaResult<T> = Result<T, ProximaError>;

impl From<std::fmt::Error> for ProximaError {
    fn from(err: std::fmt::Error) -> Self {
        ProximaError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for ProximaError {
    fn from(msg: String) -> Self {
        ProximaError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for ProximaError {
    fn from(msg: &str) -> Self {
        ProximaError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxima_error_new_creates_error() {
        let error = ProximaError::new("An error occurred", ErrorKind::ObjectNotFound);
        assert_eq!(error.message, "An error occurred");
        assert_eq!(error.error_kind, ErrorKind::ObjectNotFound);
        assert!(error.cause.is_none());
    }

    #[test]
    fn proxima_error_new_with_cause_creates_error() {
        let error = ProximaError::new_with_cause(
            "Insert failed",
            ErrorKind::IndexingError,
            ProximaError::new("Duplicate id 4", ErrorKind::DuplicateId),
        );
        assert_eq!(error.message(), "Insert failed");
        assert_eq!(error.kind(), &ErrorKind::IndexingError);
        assert_eq!(error.cause().map(|c| c.kind().clone()), Some(ErrorKind::DuplicateId));
    }

    #[test]
    fn proxima_error_display_is_message() {
        let error = ProximaError::new("An error occurred", ErrorKind::InvalidOperation);
        assert_eq!(format!("{}", error), "An error occurred");
    }

    #[test]
    fn proxima_error_debug_includes_cause() {
        let error = ProximaError::new_with_cause(
            "outer",
            ErrorKind::EventError,
            ProximaError::new("inner", ErrorKind::InternalError),
        );
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("outer"));
        assert!(formatted.contains("Caused by:"));
        assert!(formatted.contains("inner"));
    }

    #[test]
    fn proxima_error_source_follows_cause() {
        let error = ProximaError::new_with_cause(
            "outer",
            ErrorKind::EventError,
            ProximaError::new("inner", ErrorKind::InternalError),
        );
        assert!(error.source().is_some());
        let plain = ProximaError::new("plain", ErrorKind::InternalError);
        assert!(plain.source().is_none());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::NoMatchingRelation.to_string(), "No matching relation");
        assert_eq!(ErrorKind::ConfigurationError.to_string(), "Configuration error");
        assert_eq!(ErrorKind::IndexCorrupted.to_string(), "Index corrupted");
        assert_eq!(ErrorKind::Extension("Spatial".to_string()).to_string(), "Spatial error");
    }

    #[test]
    fn test_dimensionality_mismatch_is_validation() {
        assert!(ErrorKind::DimensionalityMismatch.is_validation());
        assert!(ErrorKind::ValidationError.is_validation());
        assert!(!ErrorKind::DuplicateId.is_validation());
    }

    #[test]
    fn test_from_conversions() {
        let from_string: ProximaError = "boom".to_string().into();
        assert_eq!(from_string.kind(), &ErrorKind::InternalError);
        let from_str: ProximaError = "boom".into();
        assert_eq!(from_str.message(), "boom");
        let from_fmt: ProximaError = std::fmt::Error.into();
        assert!(from_fmt.message().starts_with("Formatting error"));
    }

    #[test]
    fn test_error_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<ProximaError>();
    }
}
