//! Local path fitting
//!
//! Stabilises the vehicle frame window against degenerate longitudinal
//! spacing and fits a least squares polynomial to it. The tracking errors
//! fall straight out of the fit: the window is vehicle relative, so the
//! constant coefficient is the lateral offset at the vehicle itself and the
//! linear coefficient gives the local path heading.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::{DMatrix, DVector, Vector2};

// Internal
use util::maths::poly_val;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fitted local path polynomial.
#[derive(Debug, Clone)]
pub struct PolynomialFit {
    /// Ascending coefficients `[c0, c1, ...]`.
    coeffs: Vec<f64>,
}

/// Tracking errors derived from a fit. Recomputed every cycle, never
/// persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingError {
    /// Cross track error, the lateral offset of the path at the vehicle's
    /// own position.
    ///
    /// Units: meters
    pub cte_m: f64,

    /// Heading error, the local path heading relative to the vehicle.
    ///
    /// Units: radians
    pub epsi_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while fitting the local path.
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("A degree {degree} fit needs at least {needed} points, got {got}")]
    TooFewPoints {
        needed: usize,
        degree: usize,
        got: usize,
    },

    #[error("The window cannot determine the fit (design matrix rank {rank}, need {needed})")]
    DegenerateDesign { rank: usize, needed: usize },

    #[error("The least squares solve failed: {0}")]
    SolveFailed(String),
}

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Singular values below this are treated as zero when ranking the design
/// matrix.
const RANK_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Truncate the window at the first point whose forward spacing from the
/// previous accepted point falls below `min_x_delta_m`.
///
/// The first degree + 1 points are accepted unconditionally. Near-duplicate
/// or reversed x samples appear when the path curls back inside the lookahead
/// window, and would otherwise make the fit ill conditioned or meaningless.
pub fn stabilize_window(
    window: &[Vector2<f64>],
    degree: usize,
    min_x_delta_m: f64,
) -> Vec<Vector2<f64>> {
    let mut accepted: Vec<Vector2<f64>> = Vec::with_capacity(window.len());

    for (i, point) in window.iter().enumerate() {
        if i > degree {
            let prev_x = match accepted.last() {
                Some(p) => p[0],
                None => break,
            };

            if point[0] - prev_x < min_x_delta_m {
                warn!("Window x spacing too low, truncating at point {}", i);
                break;
            }
        }

        accepted.push(*point);
    }

    accepted
}

/// Least squares fit of y as a function of x at the given degree.
///
/// Builds the `[1, x, x^2, ...]` design matrix and solves by SVD, which
/// covers the exact case (degree + 1 points) and the over-determined case
/// with the same method.
pub fn fit_polynomial(points: &[Vector2<f64>], degree: usize) -> Result<PolynomialFit, FitError> {
    let needed = degree + 1;

    if points.len() < needed {
        return Err(FitError::TooFewPoints {
            needed,
            degree,
            got: points.len(),
        });
    }

    let design = DMatrix::from_fn(points.len(), needed, |r, c| points[r][0].powi(c as i32));
    let rhs = DVector::from_fn(points.len(), |r, _| points[r][1]);

    let svd = design.svd(true, true);

    // A full-rank design needs degree + 1 sufficiently distinct x samples.
    // Repeated x values (a window collapsed onto one spot) leave the system
    // underdetermined even when enough points were accepted.
    let rank = svd.rank(RANK_EPS);
    if rank < needed {
        return Err(FitError::DegenerateDesign { rank, needed });
    }

    let coeffs = svd
        .solve(&rhs, f64::EPSILON)
        .map_err(|e| FitError::SolveFailed(e.to_string()))?;

    Ok(PolynomialFit {
        coeffs: coeffs.iter().cloned().collect(),
    })
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PolynomialFit {
    /// The ascending coefficients `[c0, c1, ...]`.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluate the polynomial at the given x.
    pub fn eval(&self, x_m: f64) -> f64 {
        poly_val(x_m, &self.coeffs)
    }

    /// Derive the tracking errors at the vehicle's own position (x = 0 in
    /// the vehicle frame).
    pub fn tracking_error(&self) -> TrackingError {
        TrackingError {
            cte_m: self.coeffs.first().copied().unwrap_or(0.0),
            epsi_rad: -self.coeffs.get(1).copied().unwrap_or(0.0).atan(),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Sum of squared residuals of a coefficient set over a point set.
    fn residual(points: &[Vector2<f64>], coeffs: &[f64]) -> f64 {
        points
            .iter()
            .map(|p| (p[1] - poly_val(p[0], coeffs)).powi(2))
            .sum()
    }

    #[test]
    fn test_guard_accepts_strictly_increasing_window() {
        let window: Vec<Vector2<f64>> =
            (0..10).map(|i| Vector2::new(i as f64 * 0.5, 0.1)).collect();

        let accepted = stabilize_window(&window, 3, 0.05);
        assert_eq!(accepted.len(), window.len());
        assert_eq!(accepted, window);
    }

    #[test]
    fn test_guard_truncates_at_repeated_x() {
        // Repeated x coordinate at position 6 (beyond degree 3) must cut the
        // window to exactly 6 points
        let mut window: Vec<Vector2<f64>> =
            (0..10).map(|i| Vector2::new(i as f64, 0.0)).collect();
        window[6][0] = window[5][0];

        let accepted = stabilize_window(&window, 3, 0.05);
        assert_eq!(accepted.len(), 6);
    }

    #[test]
    fn test_guard_truncates_not_skips() {
        // A single bad point followed by good ones still ends the window
        let window = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(1.9, 0.0),
            Vector2::new(3.0, 0.0),
            Vector2::new(4.0, 0.0),
        ];

        let accepted = stabilize_window(&window, 1, 0.05);
        assert_eq!(accepted.len(), 3);
    }

    #[test]
    fn test_guard_ignores_early_points() {
        // Degenerate spacing inside the first degree + 1 points is accepted
        let window = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(0.0, 0.1),
            Vector2::new(0.0, 0.2),
            Vector2::new(1.0, 0.3),
        ];

        let accepted = stabilize_window(&window, 2, 0.05);
        assert_eq!(accepted.len(), 4);
    }

    #[test]
    fn test_exact_fit_reproduces_points() {
        // Degree 2 fit through exactly 3 points
        let points = vec![
            Vector2::new(-1.0, 1.4),
            Vector2::new(0.5, 2.2),
            Vector2::new(2.0, 1.6),
        ];

        let fit = fit_polynomial(&points, 2).unwrap();

        for point in points.iter() {
            assert!((fit.eval(point[0]) - point[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_overdetermined_fit_minimises_residual() {
        // Points sampled from y = 2 + 0.5x - 0.1x^2 plus small deterministic
        // noise. The fitted residual must not exceed the generating
        // polynomial's residual.
        let truth = [2.0, 0.5, -0.1];
        let points: Vec<Vector2<f64>> = (0..20)
            .map(|i| {
                let x = i as f64 * 0.3;
                let noise = 0.01 * (i as f64 * 12.9898).sin();
                Vector2::new(x, poly_val(x, &truth) + noise)
            })
            .collect();

        let fit = fit_polynomial(&points, 2).unwrap();

        assert!(residual(&points, fit.coeffs()) <= residual(&points, &truth) + 1e-12);

        // The recovered coefficients stay close to the generating ones
        for (fitted, true_coeff) in fit.coeffs().iter().zip(truth.iter()) {
            assert!((fitted - true_coeff).abs() < 0.05);
        }
    }

    #[test]
    fn test_collapsed_window_is_degenerate() {
        // Enough points, but all at the same x: the design matrix cannot
        // determine a degree 3 polynomial
        let points = vec![Vector2::new(1.0, 0.0); 4];

        let result = fit_polynomial(&points, 3);
        assert!(matches!(
            result,
            Err(FitError::DegenerateDesign { rank: 1, needed: 4 })
        ));
    }

    #[test]
    fn test_too_few_points_is_an_error() {
        let points = vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0)];

        let result = fit_polynomial(&points, 3);
        assert!(matches!(
            result,
            Err(FitError::TooFewPoints { needed: 4, got: 2, .. })
        ));
    }

    #[test]
    fn test_tracking_error_extraction() {
        let fit = PolynomialFit {
            coeffs: vec![1.25, 0.75, -0.3, 0.01],
        };

        let error = fit.tracking_error();
        assert_eq!(error.cte_m, 1.25);
        assert_eq!(error.epsi_rad, -(0.75f64.atan()));
    }

    #[test]
    fn test_zero_coefficients_give_zero_errors() {
        let fit = PolynomialFit {
            coeffs: vec![0.0, 0.0, 0.4, -0.2],
        };

        let error = fit.tracking_error();
        assert_eq!(error.cte_m, 0.0);
        assert_eq!(error.epsi_rad, 0.0);
    }
}
