//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Evaluate a polynomial with ascending coefficients `[c0, c1, ...]` at the
/// given value, using Horner's scheme.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float,
{
    let mut res = T::zero();

    for coeff in coeffs.iter().rev() {
        res = res * value + *coeff;
    }

    res
}

/// Evaluate the first derivative of a polynomial with ascending coefficients
/// `[c0, c1, ...]` at the given value.
pub fn poly_deriv_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float,
{
    let mut res = T::zero();

    for (i, coeff) in coeffs.iter().enumerate().skip(1) {
        let power = T::from(i).unwrap();
        res = res + power * *coeff * value.powi(i as i32 - 1);
    }

    res
}

/// Wrap an angle into the range [-pi, pi].
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi = T::from(std::f64::consts::PI).unwrap();
    let tau = T::from(std::f64::consts::TAU).unwrap();

    let mut wrapped = angle % tau;

    if wrapped > pi {
        wrapped = wrapped - tau;
    }
    if wrapped < -pi {
        wrapped = wrapped + tau;
    }

    wrapped
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5), 5.0);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0.0), 0.5);
        assert_eq!(lin_map((0f64, 2f64), (4f64, 0f64), 2.0), 0.0);
    }

    #[test]
    fn test_poly_val() {
        // 2 + 0.5x - 0.1x^2 at x = 2
        let coeffs = [2f64, 0.5, -0.1];
        assert!((poly_val(2.0, &coeffs) - 2.6).abs() < 1e-12);

        // Constant polynomial
        assert_eq!(poly_val(123.0, &[7f64]), 7.0);

        // Empty coefficients evaluate to zero
        assert_eq!(poly_val(1.0, &[] as &[f64]), 0.0);
    }

    #[test]
    fn test_poly_deriv_val() {
        // d/dx (2 + 0.5x - 0.1x^2) = 0.5 - 0.2x
        let coeffs = [2f64, 0.5, -0.1];
        assert!((poly_deriv_val(0.0, &coeffs) - 0.5).abs() < 1e-12);
        assert!((poly_deriv_val(2.0, &coeffs) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_to_pi() {
        use std::f64::consts::PI;

        assert!((wrap_to_pi(0f64)).abs() < 1e-12);
        assert!((wrap_to_pi(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_to_pi(-3.0 * PI) + PI).abs() < 1e-12);
        assert!((wrap_to_pi(PI / 2.0) - PI / 2.0).abs() < 1e-12);
    }
}
