//! The retry loop.
//!
//! Each call compiles a fresh backoff from its [`Config`], invokes the
//! operation, classifies any error and either waits for the next delay or
//! stops. Nothing is shared between calls, so concurrent loops need no
//! locking.

use crate::backoff::Backoff;
use crate::classify::Classified;
use crate::config::{Config, default_config};
use crate::context::Context;
use crate::error::RetryError;
use std::fmt::Display;
use std::future::Future;

/// Run `operation` until it succeeds, fails terminally, runs out of budget,
/// or `ctx` is done.
///
/// An error is retried when its message equals the message of any entry in
/// `retryable`, or when the operation itself marked it with
/// [`retryable`](crate::retryable). Matching compares `Display` output only,
/// so two distinct errors with identical text are treated alike. Use
/// [`run_if`] for stricter matching.
///
/// # Returns
/// - `Ok(T)`: the first successful result
/// - `Err(RetryError::Permanent)`: a non-retryable error, unmodified
/// - `Err(RetryError::Exhausted)`: the budget ran out; carries the last error
/// - `Err(RetryError::Context)`: cancellation or deadline, which takes
///   priority over a pending retryable error
///
/// # Examples
///
/// ```rust
/// use retrykit::{BackoffType, Classified, Config, Context, run};
/// use std::io;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = Config {
///     initial_delay: Duration::from_millis(1),
///     max_retries: 3,
///     backoff_type: Some(BackoffType::Constant),
///     ..Config::default()
/// };
/// let calls = AtomicU32::new(0);
/// let reset = io::Error::other("connection reset");
///
/// let value = run(&Context::new(), &config, |_ctx| {
///     let n = calls.fetch_add(1, Ordering::SeqCst);
///     async move {
///         if n < 2 {
///             return Err(Classified::terminal(io::Error::other("connection reset")));
///         }
///         Ok(n)
///     }
/// }, &[reset]).await.unwrap();
///
/// assert_eq!(value, 2);
/// # }
/// ```
pub async fn run<T, E, R, F, Fut>(
    ctx: &Context,
    config: &Config,
    operation: F,
    retryable: &[R],
) -> Result<T, RetryError<E>>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, Classified<E>>>,
    E: Display,
    R: Display,
{
    let messages: Vec<String> = retryable.iter().map(ToString::to_string).collect();
    let matches = |err: &E| {
        if messages.is_empty() {
            return false;
        }
        let message = err.to_string();
        messages.iter().any(|m| *m == message)
    };
    drive(ctx, config.build_backoff(), operation, matches).await
}

/// Run `operation`, trusting only its own classification.
///
/// Errors wrapped with [`retryable`](crate::retryable) are retried; every
/// other error is terminal.
pub async fn run_classified<T, E, F, Fut>(
    ctx: &Context,
    config: &Config,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, Classified<E>>>,
    E: Display,
{
    drive(ctx, config.build_backoff(), operation, |_: &E| false).await
}

/// Run `operation`, additionally retrying errors accepted by `should_retry`.
///
/// This is the strict alternative to [`run`]: the predicate sees the typed
/// error and can match on identity, variant or anything else.
///
/// ```rust
/// use retrykit::{Classified, Config, Context, RetryError, run_if};
///
/// #[derive(Debug, PartialEq)]
/// enum FetchError { Busy, Gone }
///
/// impl std::fmt::Display for FetchError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{self:?}")
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let result: Result<(), _> = run_if(
///     &Context::new(),
///     &Config::default(),
///     |_ctx| async { Err(Classified::terminal(FetchError::Gone)) },
///     |err| *err == FetchError::Busy,
/// ).await;
///
/// assert!(matches!(result, Err(RetryError::Permanent(FetchError::Gone))));
/// # }
/// ```
pub async fn run_if<T, E, F, Fut, P>(
    ctx: &Context,
    config: &Config,
    operation: F,
    should_retry: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, Classified<E>>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    drive(ctx, config.build_backoff(), operation, should_retry).await
}

async fn drive<T, E, F, Fut, P>(
    ctx: &Context,
    mut backoff: Box<dyn Backoff>,
    mut operation: F,
    should_retry: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut(Context) -> Fut,
    Fut: Future<Output = Result<T, Classified<E>>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempts: u32 = 0;

    loop {
        if let Some(cause) = ctx.err() {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempts, error = %cause, "Retry loop stopped by context");
            return Err(cause.into());
        }

        attempts = attempts.saturating_add(1);
        let (err, marked) = match operation(ctx.clone()).await {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                if attempts > 1 {
                    tracing::trace!(attempts, "Retry succeeded");
                }
                return Ok(value);
            }
            Err(classified) => classified.into_parts(),
        };

        if !(marked || should_retry(&err)) {
            #[cfg(feature = "tracing")]
            tracing::trace!(attempts, error = %err, "Non-retryable error");
            return Err(RetryError::Permanent(err));
        }

        if let Some(cause) = ctx.err() {
            return Err(cause.into());
        }

        let Some(delay) = backoff.next() else {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempts, error = %err, "Retries exhausted");
            return Err(RetryError::Exhausted { attempts, last: err });
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(attempts, ?delay, error = %err, "Retrying after backoff");

        tokio::select! {
            biased;
            cause = ctx.done() => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts, error = %cause, "Backoff wait interrupted");
                return Err(cause.into());
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

/// A reusable retry handle that owns its [`Config`].
///
/// Every call still compiles its own backoff, so one `Retrier` can drive any
/// number of concurrent loops.
///
/// ```rust
/// use retrykit::{Config, Context, Retrier, retryable};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let retrier = Retrier::new(
///     Config::builder()
///         .initial_delay(Duration::from_millis(1))
///         .jitter(Duration::ZERO)
///         .max_retries(2)
///         .build(),
/// );
///
/// let result = retrier
///     .run_classified(&Context::new(), |_ctx| async {
///         Err::<(), _>(retryable(std::io::Error::other("busy")))
///     })
///     .await;
///
/// assert_eq!(result.unwrap_err().attempts(), Some(3));
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrier {
    config: Config,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(default_config())
    }
}

impl Retrier {
    /// Create a retrier from a complete config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create a retrier from [`default_config`] with `overrides` merged in.
    pub fn with_overrides(overrides: &Config) -> Self {
        Self::new(default_config().merged(overrides))
    }

    /// The config every call compiles.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// See [`run`].
    pub async fn run<T, E, R, F, Fut>(
        &self,
        ctx: &Context,
        operation: F,
        retryable: &[R],
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T, Classified<E>>>,
        E: Display,
        R: Display,
    {
        run(ctx, &self.config, operation, retryable).await
    }

    /// See [`run_classified`].
    pub async fn run_classified<T, E, F, Fut>(
        &self,
        ctx: &Context,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T, Classified<E>>>,
        E: Display,
    {
        run_classified(ctx, &self.config, operation).await
    }

    /// See [`run_if`].
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        ctx: &Context,
        operation: F,
        should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T, Classified<E>>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        run_if(ctx, &self.config, operation, should_retry).await
    }
}
