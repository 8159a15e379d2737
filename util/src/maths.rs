//! Utility maths functions
//!
//! All angles handled here are in degrees, following the convention of the
//! heading sensor.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Multiply to convert radians into degrees, divide to convert degrees into
/// radians.
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the shortest signed angular distance from `current` to `desired`.
///
/// The result is in the range [-180, 180] and is oriented so that adding it
/// to `current` turns towards `desired` along the shorter arc.
///
/// An exact half turn has no shorter arc and is always reported as +180,
/// whichever of the two angles is ahead. A turn of exactly half a revolution
/// is therefore always made anticlockwise.
pub fn wrap<T>(current: T, desired: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap();
    let half = T::from(180.0).unwrap();

    let dist = rem_euclid(desired - current, full);

    if dist > half {
        dist - full
    }
    else {
        dist
    }
}

/// Normalise an angle into the range [0, 360).
pub fn bound<T>(angle: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap();
    let r = rem_euclid(angle, full);

    // rem_euclid can round up to the modulus for tiny negative inputs
    if r >= full {
        T::zero()
    }
    else {
        r
    }
}

/// Saturate a value into the range [min, max].
pub fn fit_to_range<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    if value > max {
        return max
    }
    if value < min {
        return min
    }

    value
}

/// Returns true if the value lies strictly within `threshold` of `setpoint`.
pub fn in_range<T>(value: T, setpoint: T, threshold: T) -> bool
where
    T: Float
{
    (setpoint - threshold < value) && (value < setpoint + threshold)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(10f64, 20f64), 10f64);
        assert_eq!(wrap(20f64, 10f64), -10f64);
        assert_eq!(wrap(350f64, 10f64), 20f64);
        assert_eq!(wrap(10f64, 350f64), -20f64);
        assert_eq!(wrap(0f64, 180f64), 180f64);
        assert_eq!(wrap(180f64, 0f64), 180f64);
        assert_eq!(wrap(270f64, 90f64), 180f64);
        assert_eq!(wrap(90f64, 300f64), -150f64);
        assert_eq!(wrap(300f64, 5f64), 65f64);

        // Stored headings are allowed to leave [0, 360)
        assert_relative_eq!(wrap(725f64, -10f64), -15f64, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_properties() {
        let mut a = -1000f64;
        while a < 1000.0 {
            assert_eq!(wrap(a, a), 0f64);

            let mut b = -720f64;
            while b < 720.0 {
                let w = wrap(a, b);
                assert!(w >= -180.0 && w <= 180.0, "wrap({}, {}) = {}", a, b, w);
                assert!(wrap(a + w, b).abs() < 1e-6);
                b += 37.3;
            }
            a += 13.7;
        }
    }

    #[test]
    fn test_bound() {
        assert_eq!(bound(0f64), 0f64);
        assert_eq!(bound(360f64), 0f64);
        assert_eq!(bound(-90f64), 270f64);
        assert_eq!(bound(725f64), 5f64);
        assert!(bound(-1e-20f64) < 360.0);

        let mut a = -1000f64;
        while a < 1000.0 {
            let b = bound(a);
            assert!(b >= 0.0 && b < 360.0);
            assert_eq!(bound(b), b);
            a += 7.9;
        }
    }

    #[test]
    fn test_fit_to_range() {
        assert_eq!(fit_to_range(2f64, -1f64, 1f64), 1f64);
        assert_eq!(fit_to_range(-2f64, -1f64, 1f64), -1f64);
        assert_eq!(fit_to_range(0.5f64, -1f64, 1f64), 0.5f64);
    }

    #[test]
    fn test_in_range() {
        assert!(in_range(1.05f64, 1f64, 0.1f64));
        assert!(!in_range(1.1f64, 1f64, 0.1f64));
        assert!(!in_range(0.8f64, 1f64, 0.1f64));
    }
}
