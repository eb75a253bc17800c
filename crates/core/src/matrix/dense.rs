use nalgebra::{DMatrix, DVector};

use crate::config::SolveSettings;

/// A diagonal entry that cannot be used as a pivot: (row, value).
pub type BadPivot = (usize, f64);

/// Find the first diagonal entry whose magnitude is at or below `tol`.
/// NaN pivots are reported as well.
pub fn find_zero_pivot(r: &DMatrix<f64>, tol: f64) -> Option<BadPivot> {
    (0..r.nrows().min(r.ncols()))
        .map(|i| (i, r[(i, i)]))
        .find(|(_, pivot)| !(pivot.abs() > tol))
}

/// Solve R*x = b for upper-triangular R by back-substitution.
///
/// Pivots are checked before dividing, so a singular R is reported with the
/// offending row instead of producing infinities.
pub fn solve_upper(
    r: &DMatrix<f64>,
    b: &DVector<f64>,
    settings: &SolveSettings,
) -> std::result::Result<DVector<f64>, BadPivot> {
    if let Some(bad) = find_zero_pivot(r, settings.pivot_tol()) {
        return Err(bad);
    }
    let x = r
        .solve_upper_triangular(b)
        .ok_or_else(|| find_zero_pivot(r, 0.0).unwrap_or((0, 0.0)))?;
    check_finite(r, x, settings)
}

/// Solve R'*x = b for upper-triangular R (forward substitution on R').
pub fn solve_upper_transpose(
    r: &DMatrix<f64>,
    b: &DVector<f64>,
    settings: &SolveSettings,
) -> std::result::Result<DVector<f64>, BadPivot> {
    if let Some(bad) = find_zero_pivot(r, settings.pivot_tol()) {
        return Err(bad);
    }
    let x = r
        .tr_solve_upper_triangular(b)
        .ok_or_else(|| find_zero_pivot(r, 0.0).unwrap_or((0, 0.0)))?;
    check_finite(r, x, settings)
}

fn check_finite(
    r: &DMatrix<f64>,
    x: DVector<f64>,
    settings: &SolveSettings,
) -> std::result::Result<DVector<f64>, BadPivot> {
    if settings.checks_finite() {
        if let Some(i) = x.iter().position(|v| !v.is_finite()) {
            return Err((i, r[(i, i)]));
        }
    }
    Ok(x)
}

/// Element-wise absolute comparison. NaN and infinite entries never compare equal.
pub fn slices_equal(a: &[f64], b: &[f64], tol: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol)
}

/// Shape check plus [`slices_equal`] on the column-major data.
pub fn matrices_equal(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) -> bool {
    a.shape() == b.shape() && slices_equal(a.as_slice(), b.as_slice(), tol)
}

/// Whether every entry strictly below the diagonal is exactly zero.
pub fn is_upper_triangular(r: &DMatrix<f64>) -> bool {
    (0..r.ncols()).all(|j| ((j + 1)..r.nrows()).all(|i| r[(i, j)] == 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_upper() {
        // R = [[2, 1], [0, 4]], b = [4, 8] => x = [1, 2]
        let r = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 4.0]);
        let b = DVector::from_column_slice(&[4.0, 8.0]);
        let x = solve_upper(&r, &b, &SolveSettings::default()).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_upper_transpose() {
        // R' = [[2, 0], [1, 4]], b = [2, 9] => x = [1, 2]
        let r = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 4.0]);
        let b = DVector::from_column_slice(&[2.0, 9.0]);
        let x = solve_upper_transpose(&r, &b, &SolveSettings::default()).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_pivot_reported() {
        let r = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 0.0]);
        let b = DVector::from_column_slice(&[1.0, 1.0]);
        assert_eq!(solve_upper(&r, &b, &SolveSettings::default()), Err((1, 0.0)));
        assert_eq!(
            solve_upper_transpose(&r, &b, &SolveSettings::default()),
            Err((1, 0.0))
        );
    }

    #[test]
    fn test_tiny_pivot_respects_tolerance() {
        let r = DMatrix::from_row_slice(1, 1, &[1e-8]);
        let b = DVector::from_column_slice(&[1.0]);
        assert!(solve_upper(&r, &b, &SolveSettings::default()).is_ok());
        let strict = SolveSettings::new().pivot_tolerance(1e-6);
        assert!(solve_upper(&r, &b, &strict).is_err());
    }

    #[test]
    fn test_nan_pivot_is_bad() {
        let r = DMatrix::from_row_slice(1, 1, &[f64::NAN]);
        assert!(find_zero_pivot(&r, 0.0).is_some());
    }

    #[test]
    fn test_matrices_equal() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut b = a.clone();
        b[(1, 1)] += 1e-10;
        assert!(matrices_equal(&a, &b, 1e-9));
        assert!(!matrices_equal(&a, &b, 0.0));
        assert!(!matrices_equal(&a, &DMatrix::zeros(2, 3), 1e9));

        let inf = DMatrix::from_element(1, 1, f64::INFINITY);
        assert!(!matrices_equal(&inf, &inf, 1.0));
    }

    #[test]
    fn test_is_upper_triangular() {
        let r = DMatrix::from_row_slice(2, 2, &[1.0, 5.0, 0.0, 1.0]);
        assert!(is_upper_triangular(&r));
        assert!(!is_upper_triangular(&r.transpose()));
    }
}
