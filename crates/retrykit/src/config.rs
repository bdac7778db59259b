//! Declarative retry configuration.
//!
//! A [`Config`] describes the backoff shape and its modifiers. Every field
//! has a zero value that means "unset", which is what makes configs
//! mergeable: [`Config::update`] copies only the fields an override
//! actually sets.
//!
//! | Field          | Unset value      | Special values                  |
//! |----------------|------------------|---------------------------------|
//! | `initial_delay`| `Duration::ZERO` |                                 |
//! | `max_retries`  | `0`              | negative (`-1`) = unlimited     |
//! | `backoff_type` | `None`           | unset compiles to exponential   |
//! | `jitter`       | `Duration::ZERO` | zero disables jitter            |
//! | `max_duration` | `Duration::ZERO` | zero = no time budget           |
//!
//! Use [`default_config`] for the recommended starting point and
//! [`Config::default`] for an empty set of overrides.

use crate::backoff::{Backoff, BackoffExt, Constant, Exponential, Fibonacci};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: i64 = 3;

/// Default total time budget for the backoff schedule.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(10);

/// Default jitter bound.
pub const DEFAULT_JITTER: Duration = Duration::from_millis(200);

/// Growth policy of the base backoff sequence.
///
/// Parsing is lenient: any name other than `constant`, `exponential` or
/// `fibonacci` (compared case-insensitively) selects [`BackoffType::Exponential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum BackoffType {
    /// Same delay every time.
    Constant,
    /// Delay doubles every time.
    Exponential,
    /// Delay follows the Fibonacci sequence.
    Fibonacci,
}

impl BackoffType {
    /// Resolve a policy name, falling back to exponential.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("constant") {
            Self::Constant
        } else if name.eq_ignore_ascii_case("fibonacci") {
            Self::Fibonacci
        } else {
            Self::Exponential
        }
    }

    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Exponential => "exponential",
            Self::Fibonacci => "fibonacci",
        }
    }

    /// Build the base shape for this policy.
    pub fn shape(self, initial_delay: Duration) -> Box<dyn Backoff> {
        match self {
            Self::Constant => Box::new(Constant::new(initial_delay)),
            Self::Exponential => Box::new(Exponential::new(initial_delay)),
            Self::Fibonacci => Box::new(Fibonacci::new(initial_delay)),
        }
    }
}

impl FromStr for BackoffType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for BackoffType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<BackoffType> for &'static str {
    fn from(kind: BackoffType) -> Self {
        kind.as_str()
    }
}

impl fmt::Display for BackoffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry configuration.
///
/// Durations serialize as human-readable strings (`"3s"`, `"200ms"`).
/// Missing fields deserialize to their unset value, so a partial document
/// is a set of overrides ready for [`Config::update`].
///
/// # Examples
///
/// ```rust
/// use retrykit::{BackoffType, Config, default_config};
/// use std::time::Duration;
///
/// let mut config = default_config();
/// config.update(&Config {
///     backoff_type: Some(BackoffType::Fibonacci),
///     max_retries: 5,
///     ..Config::default()
/// });
///
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.initial_delay, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base delay fed to the backoff shape.
    #[serde(with = "humantime_duration")]
    pub initial_delay: Duration,

    /// Retries after the first attempt. `0` falls back to
    /// [`DEFAULT_MAX_RETRIES`] when compiled; any negative value removes the
    /// attempt cap.
    pub max_retries: i64,

    /// Growth policy. `None` compiles to exponential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_type: Option<BackoffType>,

    /// Bound of the random offset added to every delay. Zero disables jitter.
    #[serde(with = "humantime_duration")]
    pub jitter: Duration,

    /// Total wall-clock budget for the schedule. Zero means unlimited.
    #[serde(with = "humantime_duration")]
    pub max_duration: Duration,
}

/// The recommended configuration.
///
/// - `initial_delay`: 3s
/// - `max_retries`: 3
/// - `backoff_type`: constant
/// - `max_duration`: 10s
/// - `jitter`: 200ms
///
/// For unbounded retry set `max_retries` to `-1` and `max_duration` to zero.
pub fn default_config() -> Config {
    Config {
        initial_delay: DEFAULT_INITIAL_DELAY,
        max_retries: DEFAULT_MAX_RETRIES,
        backoff_type: Some(BackoffType::Constant),
        jitter: DEFAULT_JITTER,
        max_duration: DEFAULT_MAX_DURATION,
    }
}

impl Config {
    /// Create a builder seeded with [`default_config`].
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a TOML document into a set of overrides.
    ///
    /// ```rust
    /// use retrykit::{BackoffType, Config};
    /// use std::time::Duration;
    ///
    /// let overrides = Config::from_toml_str(r#"
    ///     backoff_type = "exponential"
    ///     initial_delay = "250ms"
    /// "#).unwrap();
    ///
    /// assert_eq!(overrides.backoff_type, Some(BackoffType::Exponential));
    /// assert_eq!(overrides.initial_delay, Duration::from_millis(250));
    /// assert_eq!(overrides.max_retries, 0);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Merge `overrides` into this config, field by field.
    ///
    /// A field is copied only when the override sets it (non-zero). There is
    /// no way to reset a field back to its unset value through this path;
    /// build a fresh config instead.
    pub fn update(&mut self, overrides: &Config) {
        if !overrides.initial_delay.is_zero() {
            self.initial_delay = overrides.initial_delay;
        }
        if overrides.max_retries != 0 {
            self.max_retries = overrides.max_retries;
        }
        if overrides.backoff_type.is_some() {
            self.backoff_type = overrides.backoff_type;
        }
        if !overrides.jitter.is_zero() {
            self.jitter = overrides.jitter;
        }
        if !overrides.max_duration.is_zero() {
            self.max_duration = overrides.max_duration;
        }
    }

    /// Owned variant of [`Config::update`].
    pub fn merged(mut self, overrides: &Config) -> Self {
        self.update(overrides);
        self
    }

    /// The policy this config compiles to.
    pub fn effective_backoff_type(&self) -> BackoffType {
        self.backoff_type.unwrap_or(BackoffType::Exponential)
    }

    /// Compile a fresh backoff sequence.
    ///
    /// Wrapping order, innermost first: base shape, jitter, max duration,
    /// max retries. The retry budget is therefore checked before the time
    /// budget, and jitter applies to whatever delay survives both.
    pub fn build_backoff(&self) -> Box<dyn Backoff> {
        let mut backoff = self.effective_backoff_type().shape(self.initial_delay);

        if !self.jitter.is_zero() {
            backoff = Box::new(backoff.with_jitter(self.jitter));
        }

        if !self.max_duration.is_zero() {
            backoff = Box::new(backoff.with_max_duration(self.max_duration));
        }

        match u64::try_from(self.max_retries) {
            Ok(0) => backoff = Box::new(backoff.with_max_retries(DEFAULT_MAX_RETRIES as u64)),
            Ok(retries) => backoff = Box::new(backoff.with_max_retries(retries)),
            // Negative: no attempt cap.
            Err(_) => {}
        }

        backoff
    }
}

/// Fluent builder for [`Config`].
///
/// Unlike [`Config::update`], the builder can set a field to zero, e.g.
/// `.jitter(Duration::ZERO)` disables jitter.
///
/// ```rust
/// use retrykit::{BackoffType, Config};
/// use std::time::Duration;
///
/// let config = Config::builder()
///     .backoff_type(BackoffType::Exponential)
///     .initial_delay(Duration::from_millis(100))
///     .jitter(Duration::ZERO)
///     .unlimited()
///     .build();
///
/// assert_eq!(config.max_retries, -1);
/// assert!(config.max_duration.is_zero());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            config: default_config(),
        }
    }
}

impl ConfigBuilder {
    /// Set the base delay.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Set the retry budget. Negative means unlimited.
    pub fn max_retries(mut self, retries: i64) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the growth policy.
    pub fn backoff_type(mut self, kind: BackoffType) -> Self {
        self.config.backoff_type = Some(kind);
        self
    }

    /// Set the jitter bound. Zero disables jitter.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Set the total time budget. Zero means unlimited.
    pub fn max_duration(mut self, max: Duration) -> Self {
        self.config.max_duration = max;
        self
    }

    /// Remove both the retry budget and the time budget.
    pub fn unlimited(mut self) -> Self {
        self.config.max_retries = -1;
        self.config.max_duration = Duration::ZERO;
        self
    }

    /// Build the config.
    pub fn build(self) -> Config {
        self.config
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain(mut backoff: Box<dyn Backoff>, limit: usize) -> Vec<Duration> {
        std::iter::from_fn(|| backoff.next()).take(limit).collect()
    }

    #[test]
    fn test_default_config_values() {
        let config = default_config();
        assert_eq!(config.initial_delay, Duration::from_secs(3));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_type, Some(BackoffType::Constant));
        assert_eq!(config.max_duration, Duration::from_secs(10));
        assert_eq!(config.jitter, Duration::from_millis(200));
    }

    #[test]
    fn test_default_is_unset() {
        let config = Config::default();
        assert!(config.initial_delay.is_zero());
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.backoff_type, None);
        assert!(config.jitter.is_zero());
        assert!(config.max_duration.is_zero());
    }

    #[test]
    fn test_update_with_empty_overrides_is_noop() {
        let mut config = default_config();
        config.update(&Config::default());
        assert_eq!(config, default_config());
    }

    #[test]
    fn test_update_cannot_reset_to_zero() {
        let mut config = default_config();
        config.update(&Config {
            jitter: Duration::ZERO,
            max_retries: 0,
            ..Config::default()
        });
        assert_eq!(config.jitter, DEFAULT_JITTER);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_update_accepts_unlimited() {
        let config = default_config().merged(&Config {
            max_retries: -1,
            ..Config::default()
        });
        assert_eq!(config.max_retries, -1);
    }

    #[test]
    fn test_backoff_type_lenient_parse() {
        assert_eq!(BackoffType::from_name("constant"), BackoffType::Constant);
        assert_eq!(BackoffType::from_name("Fibonacci"), BackoffType::Fibonacci);
        assert_eq!(BackoffType::from_name("exponential"), BackoffType::Exponential);
        assert_eq!(BackoffType::from_name("linear"), BackoffType::Exponential);
        assert_eq!("".parse::<BackoffType>(), Ok(BackoffType::Exponential));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml_str(
            r#"
            max_retries = 5
            jitter = "50ms"
            backoff_type = "fibonacci"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.jitter, Duration::from_millis(50));
        assert_eq!(config.backoff_type, Some(BackoffType::Fibonacci));
        assert!(config.initial_delay.is_zero());
        assert!(config.max_duration.is_zero());
    }

    #[test]
    fn test_from_toml_unknown_type_is_exponential() {
        let config = Config::from_toml_str(r#"backoff_type = "quadratic""#).unwrap();
        assert_eq!(config.backoff_type, Some(BackoffType::Exponential));
    }

    #[test]
    fn test_from_toml_rejects_bad_duration() {
        let err = Config::from_toml_str(r#"initial_delay = "soon""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_serialization_is_human_readable() {
        let text = toml::to_string(&default_config()).unwrap();
        assert!(text.contains(r#"initial_delay = "3s""#), "{text}");
        assert!(text.contains(r#"jitter = "200ms""#), "{text}");
        assert!(text.contains(r#"backoff_type = "constant""#), "{text}");
        assert_eq!(Config::from_toml_str(&text).unwrap(), default_config());
    }

    #[test]
    fn test_build_unset_type_is_exponential() {
        let config = Config {
            initial_delay: Duration::from_millis(10),
            ..Config::default()
        };
        let delays = drain(config.build_backoff(), 10);
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40)
            ]
        );
    }

    #[test]
    fn test_build_zero_retries_uses_default_budget() {
        let config = Config {
            initial_delay: Duration::from_millis(1),
            backoff_type: Some(BackoffType::Constant),
            ..Config::default()
        };
        assert_eq!(drain(config.build_backoff(), 100).len(), 3);
    }

    #[test]
    fn test_build_negative_retries_is_unlimited() {
        let config = Config::builder()
            .initial_delay(Duration::from_millis(1))
            .jitter(Duration::ZERO)
            .unlimited()
            .build();
        assert_eq!(drain(config.build_backoff(), 1_000).len(), 1_000);
    }

    #[test]
    fn test_build_default_config() {
        let delays = drain(default_config().build_backoff(), 100);
        assert_eq!(delays.len(), 3);
        for delay in delays {
            assert!(delay >= Duration::from_millis(2800) && delay <= Duration::from_millis(3200));
        }
    }

    #[test]
    fn test_builder_defaults_match_default_config() {
        assert_eq!(Config::builder().build(), default_config());
    }

    fn arb_duration() -> impl Strategy<Value = Duration> {
        prop_oneof![Just(Duration::ZERO), (1u64..100_000).prop_map(Duration::from_millis)]
    }

    fn arb_backoff_type() -> impl Strategy<Value = Option<BackoffType>> {
        prop_oneof![
            Just(None),
            Just(Some(BackoffType::Constant)),
            Just(Some(BackoffType::Exponential)),
            Just(Some(BackoffType::Fibonacci)),
        ]
    }

    prop_compose! {
        fn arb_config()(
            initial_delay in arb_duration(),
            max_retries in prop_oneof![Just(0i64), Just(-1i64), 1i64..100],
            backoff_type in arb_backoff_type(),
            jitter in arb_duration(),
            max_duration in arb_duration(),
        ) -> Config {
            Config { initial_delay, max_retries, backoff_type, jitter, max_duration }
        }
    }

    proptest! {
        #[test]
        fn prop_merge_is_fieldwise(base in arb_config(), overrides in arb_config()) {
            let merged = base.clone().merged(&overrides);

            let pick = |o: Duration, b: Duration| if o.is_zero() { b } else { o };
            prop_assert_eq!(merged.initial_delay, pick(overrides.initial_delay, base.initial_delay));
            prop_assert_eq!(merged.jitter, pick(overrides.jitter, base.jitter));
            prop_assert_eq!(merged.max_duration, pick(overrides.max_duration, base.max_duration));
            prop_assert_eq!(
                merged.max_retries,
                if overrides.max_retries != 0 { overrides.max_retries } else { base.max_retries }
            );
            prop_assert_eq!(merged.backoff_type, overrides.backoff_type.or(base.backoff_type));
        }
    }
}
