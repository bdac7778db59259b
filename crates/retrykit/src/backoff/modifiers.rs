//! Decorators over a [`Backoff`]: jitter, time budget, attempt budget, delay cap.

use super::Backoff;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Adds a uniformly distributed offset in `[-jitter, +jitter]` to each delay.
///
/// The result is clamped at zero, so a delay never goes negative. Stop
/// signals from the inner sequence pass through untouched.
///
/// Randomness comes from the thread-local generator, so independent
/// sequences running on different threads never contend on a shared RNG.
#[derive(Debug, Clone)]
pub struct WithJitter<B> {
    jitter: Duration,
    inner: B,
}

impl<B: Backoff> WithJitter<B> {
    /// Wrap `inner` with a fixed jitter bound.
    pub fn new(jitter: Duration, inner: B) -> Self {
        Self { jitter, inner }
    }
}

impl<B: Backoff> Backoff for WithJitter<B> {
    fn next(&mut self) -> Option<Duration> {
        let delay = self.inner.next()?;
        Some(jitter(delay, self.jitter))
    }
}

/// Adds a random offset of up to `percent`% of each delay, in either direction.
///
/// A 10% jitter on a 1s delay yields a value in `[900ms, 1100ms]`.
#[derive(Debug, Clone)]
pub struct WithJitterPercent<B> {
    percent: u32,
    inner: B,
}

impl<B: Backoff> WithJitterPercent<B> {
    /// Wrap `inner` with proportional jitter.
    pub fn new(percent: u32, inner: B) -> Self {
        Self { percent, inner }
    }
}

impl<B: Backoff> Backoff for WithJitterPercent<B> {
    fn next(&mut self) -> Option<Duration> {
        let delay = self.inner.next()?;
        let bound = delay
            .checked_mul(self.percent)
            .map(|scaled| scaled / 100)
            .unwrap_or(Duration::MAX);
        Some(jitter(delay, bound))
    }
}

/// Stops the sequence once `max` wall-clock time has elapsed.
///
/// The clock starts on the first call to [`Backoff::next`], not at
/// construction. The budget is independent of the attempt count: it can end
/// a sequence before any retry limit is reached and vice versa.
#[derive(Debug, Clone)]
pub struct WithMaxDuration<B> {
    max: Duration,
    started: Option<Instant>,
    inner: B,
}

impl<B: Backoff> WithMaxDuration<B> {
    /// Wrap `inner` with a total time budget.
    pub fn new(max: Duration, inner: B) -> Self {
        Self {
            max,
            started: None,
            inner,
        }
    }
}

impl<B: Backoff> Backoff for WithMaxDuration<B> {
    fn next(&mut self) -> Option<Duration> {
        let started = *self.started.get_or_insert_with(Instant::now);
        if started.elapsed() >= self.max {
            return None;
        }
        self.inner.next()
    }
}

/// Stops the sequence after `retries` delays have been handed out.
///
/// `retries` counts retries, not attempts: a loop driven by this sequence
/// runs the operation at most `retries + 1` times.
#[derive(Debug, Clone)]
pub struct WithMaxRetries<B> {
    retries: u64,
    taken: u64,
    inner: B,
}

impl<B: Backoff> WithMaxRetries<B> {
    /// Wrap `inner` with a retry budget.
    pub fn new(retries: u64, inner: B) -> Self {
        Self {
            retries,
            taken: 0,
            inner,
        }
    }
}

impl<B: Backoff> Backoff for WithMaxRetries<B> {
    fn next(&mut self) -> Option<Duration> {
        if self.taken >= self.retries {
            return None;
        }
        self.taken += 1;
        self.inner.next()
    }
}

/// Clamps every delay to at most `cap`.
#[derive(Debug, Clone)]
pub struct WithCappedDuration<B> {
    cap: Duration,
    inner: B,
}

impl<B: Backoff> WithCappedDuration<B> {
    /// Wrap `inner` with a per-delay ceiling.
    pub fn new(cap: Duration, inner: B) -> Self {
        Self { cap, inner }
    }
}

impl<B: Backoff> Backoff for WithCappedDuration<B> {
    fn next(&mut self) -> Option<Duration> {
        Some(self.inner.next()?.min(self.cap))
    }
}

/// Offsets `delay` by a uniform sample from the closed range `[-bound, +bound]`.
fn jitter(delay: Duration, bound: Duration) -> Duration {
    if bound.is_zero() {
        return delay;
    }

    let span = i128::from(u64::try_from(bound.as_nanos()).unwrap_or(u64::MAX));
    let offset = rand::thread_rng().gen_range(-span..=span);
    // |offset| <= span <= u64::MAX
    let magnitude = Duration::from_nanos(offset.unsigned_abs() as u64);
    if offset < 0 {
        delay.saturating_sub(magnitude)
    } else {
        delay.saturating_add(magnitude)
    }
}
