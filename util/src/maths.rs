//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Apply polynomial coefficients to a value.
///
/// Coefficients are ordered from the highest power down to the constant term, so `[a, b, c]`
/// evaluates `a*x^2 + b*x + c`.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    // Horner's scheme
    coeffs
        .iter()
        .fold(T::zero(), |acc, &c| acc * value + c)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`. Callers needing a strict upper bound must fold
/// that case themselves.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}
