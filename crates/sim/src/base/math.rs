//! Numeric helpers used by the process implementations.

/// Threshold below which [`zero_fun`] starts smoothing.
pub const DELTA: f64 = 1e-11;

/// Tolerance used when checking that proportions sum to one.
pub const PROPORTION_TOLERANCE: f64 = 1e-6;

/// Smooth positive floor for values that must not reach zero.
///
/// Values at or above [`DELTA`] pass through unchanged. Below it the value is
/// mapped to `DELTA / (2 - x / DELTA)`, which is continuous and
/// differentiable at the boundary and strictly positive for every finite `x`.
#[inline]
pub fn zero_fun(x: f64) -> f64 {
    zero_fun_with(x, DELTA)
}

/// [`zero_fun`] with an explicit threshold.
#[inline]
pub fn zero_fun_with(x: f64, delta: f64) -> f64 {
    if x >= delta {
        x
    } else {
        delta / (2.0 - (x / delta))
    }
}

/// Whether `a` and `b` differ by less than `tolerance`.
#[inline]
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// Linear interpolation between a value cached before a process block and
/// the value after it.
#[inline]
pub fn weighted_sum(start: f64, end: f64, proportion: f64) -> f64 {
    if proportion == 0.0 {
        start
    } else if proportion == 1.0 {
        end
    } else {
        start + (end - start) * proportion
    }
}

/// Geometric interpolation between a cached value and the current one.
#[inline]
pub fn weighted_product(start: f64, end: f64, proportion: f64) -> f64 {
    if proportion == 0.0 {
        start
    } else if proportion == 1.0 {
        end
    } else {
        start.powf(1.0 - proportion) * end.powf(proportion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fun_passes_large_values() {
        assert_eq!(zero_fun(1.0), 1.0);
        assert_eq!(zero_fun(DELTA), DELTA);
    }

    #[test]
    fn test_zero_fun_is_continuous_at_threshold() {
        let below = zero_fun(DELTA * (1.0 - 1e-9));
        assert!((below - DELTA).abs() < DELTA * 1e-6);
    }

    #[test]
    fn test_zero_fun_is_positive() {
        assert_eq!(zero_fun(0.0), DELTA / 2.0);
        assert!(zero_fun(-1.0) > 0.0);
        assert!(zero_fun(-1e6) > 0.0);
    }

    #[test]
    fn test_zero_fun_is_monotone() {
        let xs = [-1.0, -DELTA, 0.0, DELTA / 2.0, DELTA, 2.0 * DELTA];
        for pair in xs.windows(2) {
            assert!(zero_fun(pair[0]) < zero_fun(pair[1]));
        }
    }

    #[test]
    fn test_interpolation_end_points() {
        assert_eq!(weighted_sum(2.0, 4.0, 0.0), 2.0);
        assert_eq!(weighted_sum(2.0, 4.0, 1.0), 4.0);
        assert_eq!(weighted_sum(2.0, 4.0, 0.5), 3.0);
        assert_eq!(weighted_product(2.0, 8.0, 0.0), 2.0);
        assert_eq!(weighted_product(2.0, 8.0, 1.0), 8.0);
        assert!(is_close(weighted_product(2.0, 8.0, 0.5), 4.0, 1e-12));
    }
}
