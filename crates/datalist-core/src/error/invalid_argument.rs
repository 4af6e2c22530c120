use super::Error;

/// Error when an operation is called with an argument it cannot accept.
///
/// This occurs when:
/// - A limit or offset is negative
/// - A filter compares a column against an empty set
/// - A sort direction, relation name or aggregate call is invalid
/// - A row is ingested without a usable `ID`
///
/// These errors are raised at the point of the call, never deferred to
/// query execution.
#[derive(Debug)]
pub(super) struct InvalidArgument {
    message: Box<str>,
}

impl std::error::Error for InvalidArgument {}

impl core::fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid argument: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidArgument(InvalidArgument {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error (or any error it wraps) is an invalid
    /// argument error.
    pub fn is_invalid_argument(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::InvalidArgument(_)))
    }
}
