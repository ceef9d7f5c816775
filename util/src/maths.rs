//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the range `[min, max]`.
///
/// NaN values are passed through unchanged, so callers which must emit finite values still need
/// to check the result.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Arithmetic mean of a slice, or `None` if the slice is empty.
pub fn mean<T>(values: &[T]) -> Option<T>
where
    T: Float
{
    if values.is_empty() {
        return None;
    }

    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);

    T::from(values.len()).map(|n| sum / n)
}

/// Get the signed angular distance between two angles in the range of [0, 2pi].
///
/// This function will return the shortest signed distance between a and b accounting for wrapping
/// between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap_or_else(T::zero);
    
    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Absolute deviation of an angle in degrees from zero, accounting for wrapping at 360.
///
/// The simulator reports attitude angles in `[0, 360)`, so a small negative tilt appears as a
/// value just under 360.
pub fn deg_deviation_from_zero(angle_deg: f64) -> f64 {
    get_ang_dist_2pi(0f64, angle_deg.to_radians()).abs().to_degrees()
}
