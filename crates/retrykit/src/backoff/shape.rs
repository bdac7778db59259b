//! Base backoff shapes: constant, exponential and Fibonacci growth.

use super::Backoff;
use std::time::Duration;

/// Returns the same delay on every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    delay: Duration,
}

impl Constant {
    /// Create a constant backoff.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for Constant {
    fn next(&mut self) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Doubles the delay on every step.
///
/// For attempt `n` (1-indexed):
/// ```text
/// delay(n) = initial_delay * 2^(n - 1)
/// ```
///
/// Growth saturates at [`Duration::MAX`] instead of overflowing, so a
/// sequence driven for an unbounded number of attempts keeps returning the
/// largest representable delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exponential {
    initial_delay: Duration,
    attempt: u32,
}

impl Exponential {
    /// Create an exponential backoff starting at `initial_delay`.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            attempt: 0,
        }
    }

    /// Number of steps taken so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Backoff for Exponential {
    fn next(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        if self.initial_delay.is_zero() {
            return Some(Duration::ZERO);
        }

        let delay = 1u128
            .checked_shl(self.attempt - 1)
            .and_then(|factor| self.initial_delay.as_nanos().checked_mul(factor))
            .map_or(Duration::MAX, saturating_from_nanos);
        Some(delay)
    }
}

/// Convert a nanosecond count to a [`Duration`], clamping at [`Duration::MAX`].
fn saturating_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    u64::try_from(nanos / NANOS_PER_SEC)
        .map_or(Duration::MAX, |secs| Duration::new(secs, subsec))
}

/// Grows the delay along the Fibonacci sequence.
///
/// For attempt `n` (1-indexed), with `F(1) = F(2) = 1`:
/// ```text
/// delay(n) = initial_delay * F(n)
/// ```
///
/// Saturates at [`Duration::MAX`] like [`Exponential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fibonacci {
    previous: Duration,
    current: Duration,
}

impl Fibonacci {
    /// Create a Fibonacci backoff starting at `initial_delay`.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            previous: Duration::ZERO,
            current: initial_delay,
        }
    }
}

impl Backoff for Fibonacci {
    fn next(&mut self) -> Option<Duration> {
        let delay = self.current;
        let following = self.previous.saturating_add(self.current);
        self.previous = self.current;
        self.current = following;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn take(backoff: &mut impl Backoff, n: usize) -> Vec<Duration> {
        (0..n).map(|_| backoff.next().unwrap()).collect()
    }

    #[test]
    fn test_constant_never_changes() {
        let mut backoff = Constant::new(Duration::from_millis(250));
        for delay in take(&mut backoff, 50) {
            assert_eq!(delay, Duration::from_millis(250));
        }
    }

    #[test]
    fn test_exponential_doubles() {
        let mut backoff = Exponential::new(Duration::from_millis(100));
        let delays = take(&mut backoff, 5);
        let expected: Vec<Duration> = [100, 200, 400, 800, 1600]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(delays, expected);
        assert_eq!(backoff.attempt(), 5);
    }

    #[test]
    fn test_exponential_saturates() {
        let mut backoff = Exponential::new(Duration::from_secs(1));
        let mut last = Duration::ZERO;
        for _ in 0..200 {
            let delay = backoff.next().unwrap();
            assert!(delay >= last, "delay went backwards: {delay:?} < {last:?}");
            last = delay;
        }
        assert_eq!(last, Duration::MAX);
    }

    #[test]
    fn test_exponential_exact_beyond_32_doublings() {
        let mut backoff = Exponential::new(Duration::from_nanos(1));
        let delays = take(&mut backoff, 34);
        assert_eq!(delays[31], Duration::from_nanos(1 << 31));
        assert_eq!(delays[32], Duration::from_nanos(1 << 32));
        assert_eq!(delays[33], Duration::from_nanos(1 << 33));
    }

    #[test]
    fn test_exponential_saturates_only_past_duration_max() {
        // 2^63 s still fits in a Duration; 2^64 s does not.
        let mut backoff = Exponential::new(Duration::from_secs(1));
        let delays = take(&mut backoff, 65);
        assert_eq!(delays[63], Duration::from_secs(1 << 63));
        assert_eq!(delays[64], Duration::MAX);
    }

    #[test]
    fn test_exponential_zero_initial_stays_zero() {
        let mut backoff = Exponential::new(Duration::ZERO);
        for delay in take(&mut backoff, 100) {
            assert_eq!(delay, Duration::ZERO);
        }
    }

    #[test]
    fn test_fibonacci_sequence() {
        let mut backoff = Fibonacci::new(Duration::from_millis(10));
        let delays = take(&mut backoff, 8);
        let expected: Vec<Duration> = [10, 10, 20, 30, 50, 80, 130, 210]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(delays, expected);
    }

    #[test]
    fn test_fibonacci_saturates() {
        let mut backoff = Fibonacci::new(Duration::from_secs(1));
        let delays = take(&mut backoff, 500);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), Duration::MAX);
    }

    proptest! {
        #[test]
        fn prop_exponential_formula(initial_ms in 1u64..10_000, n in 1u32..=30) {
            let initial = Duration::from_millis(initial_ms);
            let mut backoff = Exponential::new(initial);
            let nth = (0..n).map(|_| backoff.next().unwrap()).last().unwrap();
            prop_assert_eq!(nth, initial * 2u32.pow(n - 1));
        }

        #[test]
        fn prop_exponential_formula_past_u32_factor(
            initial_ns in 1u64..1_000_000,
            n in 1u32..=64,
        ) {
            let mut backoff = Exponential::new(Duration::from_nanos(initial_ns));
            let nth = (0..n).map(|_| backoff.next().unwrap()).last().unwrap();
            let expected = u128::from(initial_ns) << (n - 1);
            prop_assert_eq!(nth.as_nanos(), expected);
        }

        #[test]
        fn prop_fibonacci_formula(initial_ms in 1u64..10_000, n in 1usize..=40) {
            let initial = Duration::from_millis(initial_ms);
            let (mut a, mut b) = (1u64, 1u64);
            for _ in 1..n {
                (a, b) = (b, a + b);
            }
            let mut backoff = Fibonacci::new(initial);
            let nth = (0..n).map(|_| backoff.next().unwrap()).last().unwrap();
            prop_assert_eq!(nth, Duration::from_millis(initial_ms * a));
        }
    }
}
