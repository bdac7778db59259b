//! Backoff sequences and the modifiers that compose over them.
//!
//! A backoff is a stateful generator of wait durations. Each call to
//! [`Backoff::next`] consumes one step: `Some(delay)` means "wait this long,
//! then try again", `None` means the sequence refuses to continue.
//!
//! # Key Types
//!
//! - [`Backoff`] - Core trait for delay sequences
//! - [`Constant`], [`Exponential`], [`Fibonacci`] - Base shapes (never stop)
//! - [`WithJitter`], [`WithMaxDuration`], [`WithMaxRetries`] - Decorators
//!   that add randomization or stopping conditions
//!
//! # Examples
//!
//! ```rust
//! use retrykit::backoff::{Backoff, BackoffExt, Exponential};
//! use std::time::Duration;
//!
//! let mut backoff = Exponential::new(Duration::from_millis(100)).with_max_retries(2);
//!
//! assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
//! assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
//! assert_eq!(backoff.next(), None);
//! ```

mod modifiers;
mod shape;

pub use modifiers::{
    WithCappedDuration, WithJitter, WithJitterPercent, WithMaxDuration, WithMaxRetries,
};
pub use shape::{Constant, Exponential, Fibonacci};

use std::time::Duration;

/// A stateful generator of retry delays.
///
/// Base shapes always return `Some`. Only modifiers stop a sequence, but the
/// interface is uniform so any modifier can wrap a shape or another modifier.
///
/// A sequence is meant to be owned by exactly one retry loop. It is `Send`
/// so the loop future can move between worker threads, but it is never
/// shared.
pub trait Backoff: Send {
    /// Advance the sequence by one step.
    ///
    /// # Returns
    /// - `Some(Duration)`: Wait this long before the next attempt
    /// - `None`: Stop retrying
    fn next(&mut self) -> Option<Duration>;
}

impl<B: Backoff + ?Sized> Backoff for Box<B> {
    fn next(&mut self) -> Option<Duration> {
        (**self).next()
    }
}

/// Fluent wrappers for composing modifiers over any [`Backoff`].
///
/// Wrapping order matters: the last modifier applied is the outermost one
/// and is consulted first on every step.
///
/// ```rust
/// use retrykit::backoff::{Backoff, BackoffExt, Constant};
/// use std::time::Duration;
///
/// let mut backoff = Constant::new(Duration::from_secs(1))
///     .with_jitter(Duration::from_millis(200))
///     .with_max_duration(Duration::from_secs(10))
///     .with_max_retries(3);
///
/// let delay = backoff.next().unwrap();
/// assert!(delay >= Duration::from_millis(800) && delay <= Duration::from_millis(1200));
/// ```
pub trait BackoffExt: Backoff + Sized {
    /// Add a uniform random offset in `[-jitter, +jitter]` to every delay.
    fn with_jitter(self, jitter: Duration) -> WithJitter<Self> {
        WithJitter::new(jitter, self)
    }

    /// Add a random offset of up to `percent`% of each delay, in either direction.
    fn with_jitter_percent(self, percent: u32) -> WithJitterPercent<Self> {
        WithJitterPercent::new(percent, self)
    }

    /// Stop once `max` wall-clock time has passed since the first step.
    fn with_max_duration(self, max: Duration) -> WithMaxDuration<Self> {
        WithMaxDuration::new(max, self)
    }

    /// Stop after handing out `retries` delays.
    fn with_max_retries(self, retries: u64) -> WithMaxRetries<Self> {
        WithMaxRetries::new(retries, self)
    }

    /// Clamp every individual delay to at most `cap`.
    fn with_capped_duration(self, cap: Duration) -> WithCappedDuration<Self> {
        WithCappedDuration::new(cap, self)
    }
}

impl<B: Backoff> BackoffExt for B {}
