use super::Error;

/// Error when an operation is not supported in the receiver's current state.
///
/// Examples are calling `where_` on a HAVING group, mutating the membership
/// of an eager-loaded list, or registering the same CTE name twice.
#[derive(Debug)]
pub(super) struct BadMethodCall {
    message: Box<str>,
}

impl std::error::Error for BadMethodCall {}

impl core::fmt::Display for BadMethodCall {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "bad method call: {}", self.message)
    }
}

impl Error {
    /// Creates a bad method call error.
    pub fn bad_method_call(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::BadMethodCall(BadMethodCall {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error (or any error it wraps) is a bad method
    /// call error.
    pub fn is_bad_method_call(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::BadMethodCall(_)))
    }
}
