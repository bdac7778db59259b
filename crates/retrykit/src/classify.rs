//! Retryable vs terminal error classification.

use std::error::Error;
use std::fmt;

/// An operation error tagged with whether it is worth retrying.
///
/// Operations driven by the retry loop return `Result<T, Classified<E>>`.
/// A plain `E` converts into a *terminal* classification, so `?` inside an
/// operation works without ceremony; use [`retryable`] (or
/// [`Classified::retryable`]) to mark a transient failure.
///
/// # Examples
///
/// ```rust
/// use retrykit::{Classified, retryable};
/// use std::io;
///
/// let terminal: Classified<io::Error> = io::Error::other("bad request").into();
/// assert!(!terminal.is_retryable());
///
/// let transient = retryable(io::Error::other("connection reset"));
/// assert!(transient.is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified<E> {
    error: E,
    retryable: bool,
}

impl<E> Classified<E> {
    /// Mark `error` as transient.
    pub fn retryable(error: E) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    /// Mark `error` as final.
    pub fn terminal(error: E) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    /// Whether the loop should retry after this error.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Borrow the wrapped error.
    pub fn error(&self) -> &E {
        &self.error
    }

    /// Unwrap the classification.
    pub fn into_inner(self) -> E {
        self.error
    }

    pub(crate) fn into_parts(self) -> (E, bool) {
        (self.error, self.retryable)
    }
}

impl<E> From<E> for Classified<E> {
    fn from(error: E) -> Self {
        Self::terminal(error)
    }
}

impl<E: fmt::Display> fmt::Display for Classified<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<E: Error + 'static> Error for Classified<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Mark an arbitrary error as retryable.
pub fn retryable<E>(error: E) -> Classified<E> {
    Classified::retryable(error)
}
