//! Delay computation between scheduled emissions.

use std::time::Duration;

use serde_json::Value;

use crate::config::ConfigError;
use crate::numeric::parse_int;
use crate::random::RandomSource;

/// Fixed interval used when `intervalFixed` is unset, non-numeric or zero.
pub const DEFAULT_FIXED_MS: u64 = 5_000;
/// Lower random bound used when `intervalMin` is unset, non-numeric or zero.
pub const DEFAULT_MIN_MS: u64 = 1_000;
/// Upper random bound used when `intervalMax` is unset, non-numeric or zero.
pub const DEFAULT_MAX_MS: u64 = 10_000;

/// Mode string selecting the fixed branch. Any other non-empty mode is random.
pub const MODE_FIXED: &str = "fixed";

/// How long to wait before the next scheduled emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalPolicy {
    /// Always the same delay.
    Fixed {
        /// Delay in milliseconds.
        interval_ms: u64,
    },
    /// Integer delay drawn uniformly from `[min_ms, max_ms]`.
    Random {
        /// Inclusive lower bound in milliseconds.
        min_ms: u64,
        /// Inclusive upper bound in milliseconds.
        max_ms: u64,
    },
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self::Fixed {
            interval_ms: DEFAULT_FIXED_MS,
        }
    }
}

impl IntervalPolicy {
    /// Resolves the policy from raw settings values.
    ///
    /// Only the values of the selected branch are read and validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NegativeDuration`] for negative values and
    /// [`ConfigError::IntervalRange`] when the random minimum exceeds the maximum.
    pub fn resolve(
        mode: &str,
        fixed: &Value,
        min: &Value,
        max: &Value,
    ) -> Result<Self, ConfigError> {
        if mode.is_empty() || mode == MODE_FIXED {
            return Ok(Self::Fixed {
                interval_ms: coerce_ms("intervalFixed", fixed, DEFAULT_FIXED_MS)?,
            });
        }

        let min_ms = coerce_ms("intervalMin", min, DEFAULT_MIN_MS)?;
        let max_ms = coerce_ms("intervalMax", max, DEFAULT_MAX_MS)?;
        if min_ms > max_ms {
            return Err(ConfigError::IntervalRange { min_ms, max_ms });
        }
        Ok(Self::Random { min_ms, max_ms })
    }

    /// Computes the delay until the next emission.
    pub fn next_interval(&self, rng: &mut dyn RandomSource) -> Duration {
        match *self {
            Self::Fixed { interval_ms } => Duration::from_millis(interval_ms),
            Self::Random { min_ms, max_ms } => {
                let width = max_ms - min_ms;
                #[allow(clippy::cast_precision_loss)]
                let span = (width + 1) as f64;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let offset = (rng.next_unit() * span).floor() as u64;
                Duration::from_millis(min_ms + offset.min(width))
            }
        }
    }
}

/// Coerces a millisecond setting, substituting `default` for unset,
/// non-numeric or zero values.
///
/// # Errors
///
/// Returns [`ConfigError::NegativeDuration`] when the value is negative.
pub fn coerce_ms(option: &'static str, value: &Value, default: u64) -> Result<u64, ConfigError> {
    match parse_int(value) {
        None | Some(0) => Ok(default),
        Some(ms) if ms < 0 => Err(ConfigError::NegativeDuration { option, value: ms }),
        Some(ms) => Ok(ms.unsigned_abs()),
    }
}
