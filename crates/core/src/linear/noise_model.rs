use nalgebra::DVector;

use crate::error::{ElimError, Result};
use crate::matrix::slices_equal;

/// Per-row noise scale of a Gaussian conditional.
///
/// A sigma of exactly zero marks a *constrained* row: a hard, noise-free
/// constraint such as a fixed variable. Constrained rows are never whitened.
/// This is the only way to express a fixed variable; a zero on the diagonal of
/// `R` is always a singular system.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseModel {
    /// All rows have sigma 1 (the rows are already whitened).
    Unit,
    /// One sigma per row.
    Diagonal(DVector<f64>),
}

impl NoiseModel {
    /// Diagonal model from sigmas.
    ///
    /// # Errors
    /// Returns [`ElimError::InvalidConditional`] for a negative or non-finite sigma.
    pub fn diagonal(sigmas: DVector<f64>) -> Result<Self> {
        if let Some(bad) = sigmas.iter().find(|s| !(s.is_finite() && **s >= 0.0)) {
            return Err(ElimError::InvalidConditional(format!(
                "sigma {} is not a finite non-negative number",
                bad
            )));
        }
        Ok(NoiseModel::Diagonal(sigmas))
    }

    /// Sigma of `row`.
    pub fn sigma(&self, row: usize) -> f64 {
        match self {
            NoiseModel::Unit => 1.0,
            NoiseModel::Diagonal(sigmas) => sigmas[row],
        }
    }

    /// All sigmas for a conditional with `rows` rows.
    pub fn sigmas(&self, rows: usize) -> DVector<f64> {
        match self {
            NoiseModel::Unit => DVector::from_element(rows, 1.0),
            NoiseModel::Diagonal(sigmas) => sigmas.clone(),
        }
    }

    /// Number of rows the model is defined for, if fixed.
    pub fn dim(&self) -> Option<usize> {
        match self {
            NoiseModel::Unit => None,
            NoiseModel::Diagonal(sigmas) => Some(sigmas.len()),
        }
    }

    pub fn is_unit(&self) -> bool {
        match self {
            NoiseModel::Unit => true,
            NoiseModel::Diagonal(sigmas) => sigmas.iter().all(|&s| s == 1.0),
        }
    }

    /// Whether any row is a hard constraint.
    pub fn is_constrained(&self) -> bool {
        match self {
            NoiseModel::Unit => false,
            NoiseModel::Diagonal(sigmas) => sigmas.iter().any(|&s| s == 0.0),
        }
    }

    /// Factor that whitens `row`: 1/sigma, or 1 for a constrained row.
    pub fn whitening_factor(&self, row: usize) -> f64 {
        let sigma = self.sigma(row);
        if sigma == 0.0 {
            1.0
        } else {
            1.0 / sigma
        }
    }

    /// Compare sigmas within `tol`. `Unit` equals a diagonal model of ones.
    pub fn equals(&self, other: &Self, rows: usize, tol: f64) -> bool {
        match (self, other) {
            (NoiseModel::Unit, NoiseModel::Unit) => true,
            _ => slices_equal(
                self.sigmas(rows).as_slice(),
                other.sigmas(rows).as_slice(),
                tol,
            ),
        }
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Unit
    }
}
