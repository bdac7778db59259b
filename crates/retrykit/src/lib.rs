#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Bounded, jittered, cancellable retry for fallible async operations.
//!
//! This crate turns a declarative [`Config`] into a composed backoff
//! sequence and drives an operation through it:
//!
//! - **Backoff shapes** via the [`Backoff`](backoff::Backoff) trait
//!   - Constant, exponential and Fibonacci growth, saturating on overflow
//!   - Jitter, max-duration, max-retries and delay-cap decorators
//! - **Mergeable configuration** via [`Config`] and [`Config::update`]
//! - **Retry loops** via [`run`], [`run_classified`], [`run_if`] and [`Retrier`]
//! - **Cooperative cancellation** via [`Context`]
//!
//! # Design Philosophy
//!
//! A backoff is compiled fresh for every call and owned by that call alone.
//! Concurrent loops never share state, so the engine needs no locks and
//! spawns no tasks. The only suspension point is the wait between attempts,
//! and that wait always races the caller's [`Context`].
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use retrykit::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = default_config().merged(&Config {
//!     initial_delay: Duration::from_millis(100),
//!     backoff_type: Some(BackoffType::Exponential),
//!     ..Config::default()
//! });
//!
//! let value = run_classified(&Context::new(), &config, |_ctx| async {
//!     Ok::<_, Classified<std::io::Error>>(42)
//! })
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod run;

pub use classify::{Classified, retryable};
pub use config::{BackoffType, Config, ConfigBuilder, default_config};
pub use context::Context;
pub use error::{ConfigError, ContextError, RetryError};
pub use run::{Retrier, run, run_classified, run_if};

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use retrykit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backoff::{Backoff, BackoffExt, Constant, Exponential, Fibonacci};
    pub use crate::classify::{Classified, retryable};
    pub use crate::config::{BackoffType, Config, default_config};
    pub use crate::context::Context;
    pub use crate::error::{ContextError, RetryError};
    pub use crate::run::{Retrier, run, run_classified, run_if};
}
