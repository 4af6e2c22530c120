use super::Error;

/// Error when a named strategy, class or model cannot be resolved.
#[derive(Debug)]
pub(super) struct NotFound {
    message: Box<str>,
}

impl std::error::Error for NotFound {}

impl core::fmt::Display for NotFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "not found: {}", self.message)
    }
}

impl Error {
    /// Creates a lookup error.
    pub fn not_found(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::NotFound(NotFound {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error (or any error it wraps) is a lookup error.
    pub fn is_not_found(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::NotFound(_)))
    }
}
