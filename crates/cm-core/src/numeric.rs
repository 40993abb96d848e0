//! Clamp and step-rounding primitives.
//!
//! Every bounded, snapped value in the workspace (intensity, before/after
//! blend, slider positions) goes through these two functions.

/// Restrict `value` to `[min, max]`.
///
/// `NaN` is not an error: it maps to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Round `value` to the nearest multiple of `step`.
///
/// A zero step returns `value` unchanged. For fractional steps the result is
/// re-rounded to the step's decimal precision, so `round_to_step(0.15, 0.05)`
/// yields `0.15` rather than `0.15000000000000002`.
///
/// Halves round towards positive infinity (`-2.5` steps to `-2`).
pub fn round_to_step(value: f64, step: f64) -> f64 {
    if step == 0.0 {
        return value;
    }
    let rounded = (value / step + 0.5).floor() * step;
    round_to_decimals(rounded, step_precision(step))
}

/// Number of decimal places implied by `step` (0 for steps >= 1).
fn step_precision(step: f64) -> i32 {
    if step >= 1.0 {
        return 0;
    }
    // f64 Display never uses exponent notation, so the fractional digits are
    // exactly the ones a human wrote (0.05 -> "0.05").
    step.to_string()
        .split_once('.')
        .map(|(_, frac)| frac.len() as i32)
        .unwrap_or(0)
}

fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
