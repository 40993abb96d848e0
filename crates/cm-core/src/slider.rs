//! Pure value calculation for slider widgets.
//!
//! Gesture handling stays in the rendering layer; it only reports a touch
//! position and the track width, and these functions turn that into a value.

use crate::numeric::{clamp, round_to_step};

/// Map a touch position on the track to a snapped, bounded slider value.
pub fn calculate_slider_value(
    position_x: f64,
    track_width: f64,
    min: f64,
    max: f64,
    step: f64,
) -> f64 {
    let ratio = clamp(position_x / track_width, 0.0, 1.0);
    let raw = min + ratio * (max - min);
    clamp(round_to_step(raw, step), min, max)
}

/// Position of `value` within `[min, max]` as a percentage.
///
/// A degenerate range (`min == max`) reports 0.
pub fn calculate_percent(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    (value - min) / (max - min) * 100.0
}

pub fn is_valid_slider_config(min: f64, max: f64, step: f64) -> bool {
    min < max && step > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_from_touch_position() {
        assert_eq!(calculate_slider_value(0.0, 200.0, 0.0, 100.0, 5.0), 0.0);
        assert_eq!(calculate_slider_value(100.0, 200.0, 0.0, 100.0, 5.0), 50.0);
        assert_eq!(calculate_slider_value(127.0, 200.0, 0.0, 100.0, 5.0), 65.0);
        assert_eq!(calculate_slider_value(200.0, 200.0, 0.0, 100.0, 5.0), 100.0);
    }

    #[test]
    fn touches_outside_track_are_clamped() {
        assert_eq!(calculate_slider_value(-40.0, 200.0, 0.0, 100.0, 5.0), 0.0);
        assert_eq!(calculate_slider_value(900.0, 200.0, 0.0, 100.0, 5.0), 100.0);
    }

    #[test]
    fn zero_width_track_falls_back_to_min() {
        // 0/0 is NaN, which clamp maps to the lower bound.
        assert_eq!(calculate_slider_value(0.0, 0.0, 0.0, 100.0, 5.0), 0.0);
    }

    #[test]
    fn fractional_range_for_blend_slider() {
        assert_eq!(calculate_slider_value(33.0, 100.0, 0.0, 1.0, 0.05), 0.35);
    }

    #[test]
    fn percent_of_range() {
        assert_eq!(calculate_percent(25.0, 0.0, 100.0), 25.0);
        assert_eq!(calculate_percent(15.0, 10.0, 20.0), 50.0);
        assert_eq!(calculate_percent(5.0, 5.0, 5.0), 0.0);
    }

    #[test]
    fn slider_config_validation() {
        assert!(is_valid_slider_config(0.0, 100.0, 5.0));
        assert!(!is_valid_slider_config(100.0, 0.0, 5.0));
        assert!(!is_valid_slider_config(0.0, 0.0, 5.0));
        assert!(!is_valid_slider_config(0.0, 100.0, 0.0));
        assert!(!is_valid_slider_config(0.0, f64::NAN, 1.0));
    }
}
