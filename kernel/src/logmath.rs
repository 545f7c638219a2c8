//! Log-domain score arithmetic.
//!
//! All scores are natural logarithms of probabilities. Higher is better;
//! combining independent factors is addition. [`LOG_ZERO`] is the finite
//! floor used for "zero probability" so that admission comparisons never
//! see NaN.

/// Log of probability zero. Finite so that `a - b` and `a < b` stay defined.
pub const LOG_ZERO: f32 = -f32::MAX;

/// Log of probability one.
pub const LOG_ONE: f32 = 0.0;

/// Convert a linear probability to the log domain.
///
/// Non-positive (and NaN) inputs map to [`LOG_ZERO`].
#[must_use]
pub fn linear_to_log(linear: f64) -> f32 {
    if linear.is_nan() || linear <= 0.0 {
        return LOG_ZERO;
    }
    #[allow(clippy::cast_possible_truncation)]
    let log = linear.ln() as f32;
    sanitize(log)
}

/// Convert a log-domain value back to a linear probability.
#[must_use]
pub fn log_to_linear(log: f32) -> f64 {
    if log <= LOG_ZERO {
        return 0.0;
    }
    f64::from(log).exp()
}

/// Clamp a score into the comparable range.
///
/// NaN and `-inf` become [`LOG_ZERO`]; `+inf` becomes `f32::MAX`.
#[must_use]
pub fn sanitize(score: f32) -> f32 {
    if score.is_nan() || score == f32::NEG_INFINITY {
        LOG_ZERO
    } else if score == f32::INFINITY {
        f32::MAX
    } else {
        score
    }
}

/// `ln(e^a + e^b)` on f64 working values.
///
/// Working values may be scaled far beyond the f32 range, so only `-inf`
/// (and NaN) act as the additive identity here, not [`LOG_ZERO`].
#[must_use]
pub fn add_as_linear(a: f64, b: f64) -> f64 {
    if a.is_nan() || a == f64::NEG_INFINITY {
        return if b.is_nan() { f64::NEG_INFINITY } else { b };
    }
    if b.is_nan() || b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Convert a linear relative beam width into a non-positive log offset.
///
/// A width of zero (or below) disables relative pruning and yields `None`.
#[must_use]
pub fn relative_beam_to_log(linear: f64) -> Option<f32> {
    if linear.is_nan() || linear <= 0.0 {
        None
    } else {
        Some(linear_to_log(linear))
    }
}
