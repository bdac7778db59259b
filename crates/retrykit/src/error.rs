//! Error types returned by the retry loop.
//!
//! Every failure is handed back to the caller. The loop distinguishes four
//! outcomes:
//!
//! - a terminal operation error, returned unmodified ([`RetryError::Permanent`])
//! - an exhausted budget, carrying the last operation error ([`RetryError::Exhausted`])
//! - cancellation or an expired deadline ([`RetryError::Context`])
//! - success, which is not an error at all

use thiserror::Error;

/// Why a [`Context`](crate::Context) stopped the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ContextError {
    /// The context was cancelled explicitly.
    #[error("context canceled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Failure of a retried operation.
///
/// `E` is the operation's own error type.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with an error that is not retryable.
    #[error(transparent)]
    Permanent(E),

    /// The backoff refused to continue: either the retry budget or the
    /// duration budget ran out.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Total number of operation invocations, including the first.
        attempts: u32,
        /// The error returned by the final invocation.
        #[source]
        last: E,
    },

    /// The surrounding context was cancelled or its deadline passed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl<E> RetryError<E> {
    /// The operation error, if this failure carries one.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Permanent(err) | Self::Exhausted { last: err, .. } => Some(err),
            Self::Context(_) => None,
        }
    }

    /// Consume the failure and return the operation error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Permanent(err) | Self::Exhausted { last: err, .. } => Some(err),
            Self::Context(_) => None,
        }
    }

    /// Number of invocations performed before the budget ran out.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The context error, if the loop was cancelled or timed out.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Context(err) => Some(*err),
            _ => None,
        }
    }

    /// Whether the retry budget was consumed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Whether the loop stopped because of its context.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Context(_))
    }

    /// Whether the operation returned a non-retryable error.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// Errors that can occur while loading a [`Config`](crate::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid retry configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
