use std::fmt;
use std::ops::Range;

use nalgebra::{DMatrix, DVector};

use crate::config::SolveSettings;
use crate::error::{ElimError, Result};
use crate::inference::{check_key_layout, Conditional};
use crate::matrix::dense::{is_upper_triangular, BadPivot};
use crate::matrix::{matrices_equal, slices_equal, solve_upper, solve_upper_transpose};
use crate::symbolic::SymbolicConditional;
use crate::types::Key;

use super::noise_model::NoiseModel;
use super::vector_values::VectorValues;

/// A linear-Gaussian conditional density on the frontal variables given the parents:
///
/// ```text
/// R * x_frontals + S * x_parents = d      (row i scaled by sigma_i)
/// ```
///
/// `R` is square and upper-triangular, one column block per frontal variable.
/// `S` holds one column block per parent. Each variable may be multi-dimensional.
///
/// The conditional is immutable once built. Zero pivots are accepted here and
/// reported as [`ElimError::SingularSystem`] by every operation that divides by them.
#[derive(Debug, Clone)]
pub struct GaussianConditional {
    keys: Vec<Key>,
    dims: Vec<usize>,
    nr_frontals: usize,
    r: DMatrix<f64>,
    s: DMatrix<f64>,
    d: DVector<f64>,
    model: NoiseModel,
}

impl GaussianConditional {
    /// Build a conditional with unit noise from per-variable blocks.
    ///
    /// # Errors
    /// - [`ElimError::InvalidConditional`] if there are no frontals, a key repeats,
    ///   a block is empty, or `R` has non-zero entries below the diagonal.
    /// - [`ElimError::DimensionMismatch`] if a block's row count differs from `d`,
    ///   or the frontal blocks do not form a square `R`.
    pub fn new(
        frontals: Vec<(Key, DMatrix<f64>)>,
        parents: Vec<(Key, DMatrix<f64>)>,
        d: DVector<f64>,
    ) -> Result<Self> {
        Self::with_model(frontals, parents, d, NoiseModel::Unit)
    }

    /// Like [`GaussianConditional::new`] with an explicit noise model.
    pub fn with_model(
        frontals: Vec<(Key, DMatrix<f64>)>,
        parents: Vec<(Key, DMatrix<f64>)>,
        d: DVector<f64>,
        model: NoiseModel,
    ) -> Result<Self> {
        let nr_frontals = frontals.len();
        let rows = d.len();
        let keys: Vec<Key> = frontals.iter().chain(&parents).map(|(k, _)| *k).collect();
        check_key_layout(&keys, nr_frontals).map_err(ElimError::InvalidConditional)?;

        for (key, block) in frontals.iter().chain(&parents) {
            if block.ncols() == 0 {
                return Err(ElimError::InvalidConditional(format!(
                    "variable {} has an empty block",
                    key
                )));
            }
            if block.nrows() != rows {
                return Err(ElimError::DimensionMismatch {
                    expected: rows,
                    got: block.nrows(),
                    context: format!("rows of the block for variable {}", key),
                });
            }
        }
        let dims: Vec<usize> = frontals.iter().chain(&parents).map(|(_, m)| m.ncols()).collect();
        let frontal_dim: usize = dims[..nr_frontals].iter().sum();
        if frontal_dim != rows {
            return Err(ElimError::DimensionMismatch {
                expected: rows,
                got: frontal_dim,
                context: "columns of the frontal block R".to_string(),
            });
        }
        if let Some(n) = model.dim() {
            if n != rows {
                return Err(ElimError::DimensionMismatch {
                    expected: rows,
                    got: n,
                    context: "number of sigmas".to_string(),
                });
            }
        }

        let r = hstack(&frontals, rows);
        if !is_upper_triangular(&r) {
            return Err(ElimError::InvalidConditional(format!(
                "R of the conditional on {} is not upper-triangular",
                keys[0]
            )));
        }
        let s = hstack(&parents, rows);

        Ok(Self {
            keys,
            dims,
            nr_frontals,
            r,
            s,
            d,
            model,
        })
    }

    /// One-dimensional conditional `r * x_key + sum(s_j * x_j) = d`.
    pub fn scalar(key: Key, r: f64, parents: &[(Key, f64)], d: f64) -> Result<Self> {
        Self::new(
            vec![(key, DMatrix::from_element(1, 1, r))],
            parents
                .iter()
                .map(|&(k, s)| (k, DMatrix::from_element(1, 1, s)))
                .collect(),
            DVector::from_element(1, d),
        )
    }

    /// The square upper-triangular frontal block.
    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    /// All parent blocks side by side, in parent order.
    pub fn s(&self) -> &DMatrix<f64> {
        &self.s
    }

    pub fn d(&self) -> &DVector<f64> {
        &self.d
    }

    pub fn model(&self) -> &NoiseModel {
        &self.model
    }

    /// Number of rows, equal to the total frontal dimension.
    pub fn rows(&self) -> usize {
        self.d.len()
    }

    /// Dimension of every key, frontals first.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim(&self, key: Key) -> Option<usize> {
        self.keys
            .iter()
            .position(|&k| k == key)
            .map(|i| self.dims[i])
    }

    /// The block of `S` belonging to parent `key`.
    pub fn parent_matrix(&self, key: Key) -> Option<DMatrix<f64>> {
        let i = self.parents().iter().position(|&k| k == key)?;
        let offset: usize = self.dims[self.nr_frontals..self.nr_frontals + i].iter().sum();
        let dim = self.dims[self.nr_frontals + i];
        Some(self.s.columns(offset, dim).into_owned())
    }

    /// Frontal variable owning `row` of `R`.
    pub fn frontal_key_of_row(&self, row: usize) -> Key {
        let mut end = 0;
        for (i, &dim) in self.dims[..self.nr_frontals].iter().enumerate() {
            end += dim;
            if row < end {
                return self.keys[i];
            }
        }
        self.keys[self.nr_frontals - 1]
    }

    /// Solve for the frontal variables given already-solved parents:
    /// `x = R^-1 (d - S * x_parents)`.
    ///
    /// # Errors
    /// - [`ElimError::UnboundVariable`] if a parent is missing from `parents`.
    /// - [`ElimError::SingularSystem`] if a pivot of `R` is numerically zero.
    pub fn solve(&self, parents: &VectorValues, settings: &SolveSettings) -> Result<VectorValues> {
        let rhs = self.subtract_parents(&self.d, parents)?;
        let x = solve_upper(&self.r, &rhs, settings).map_err(|bad| self.singular(bad))?;
        Ok(self.split_frontals(&x))
    }

    /// Solve with the frontal right-hand side taken from `rhs` instead of `d`,
    /// then scale by the sigmas: `x = sigma .* R^-1 (rhs_frontals - S * x_parents)`.
    pub fn solve_other_rhs(
        &self,
        parents: &VectorValues,
        rhs: &VectorValues,
        settings: &SolveSettings,
    ) -> Result<VectorValues> {
        let base = self.gather(rhs, 0..self.nr_frontals)?;
        let b = self.subtract_parents(&base, parents)?;
        let mut x = solve_upper(&self.r, &b, settings).map_err(|bad| self.singular(bad))?;
        self.scale_by_sigmas(&mut x);
        Ok(self.split_frontals(&x))
    }

    /// One step of transposed back-substitution, in place on `gy`:
    /// `z = R^-T gy_frontals`, then `gy_p -= S_p^T z` for every parent `p`,
    /// and finally `gy_frontals = sigma .* z`.
    ///
    /// `gy` is only modified once every lookup has succeeded.
    pub fn solve_transpose_in_place(
        &self,
        gy: &mut VectorValues,
        settings: &SolveSettings,
    ) -> Result<()> {
        let frontal = self.gather(gy, 0..self.nr_frontals)?;
        self.gather(gy, self.nr_frontals..self.keys.len())?;
        let mut z = solve_upper_transpose(&self.r, &frontal, settings)
            .map_err(|bad| self.singular(bad))?;

        let st_z = self.s.tr_mul(&z);
        let mut offset = 0;
        for (&key, &dim) in self.parents().iter().zip(&self.dims[self.nr_frontals..]) {
            if let Some(value) = gy.get_mut(key) {
                *value -= &st_z.rows(offset, dim);
            }
            offset += dim;
        }

        self.scale_by_sigmas(&mut z);
        for (key, value) in self.split_frontals(&z).iter() {
            gy.insert(key, value.clone());
        }
        Ok(())
    }

    /// `sum(ln(diag(R_whitened)))`. Constrained rows contribute their unwhitened pivot.
    ///
    /// The tolerance applies to the raw diagonal of `R`, as in the solves, so
    /// a system that solves also has a determinant.
    ///
    /// # Errors
    /// Returns [`ElimError::SingularSystem`] if a diagonal entry of `R` is not
    /// strictly greater than the pivot tolerance (zero, negative or NaN).
    pub fn log_determinant(&self, settings: &SolveSettings) -> Result<f64> {
        let mut log_det = 0.0;
        for i in 0..self.rows() {
            let pivot = self.r[(i, i)];
            if !(pivot > settings.pivot_tol()) {
                return Err(self.singular((i, pivot)));
            }
            log_det += pivot.ln() + self.model.whitening_factor(i).ln();
        }
        Ok(log_det)
    }

    /// `(R, S, d)` with each row divided by its sigma. Constrained rows are unchanged.
    pub fn whitened(&self) -> (DMatrix<f64>, DMatrix<f64>, DVector<f64>) {
        let mut r = self.r.clone();
        let mut s = self.s.clone();
        let mut d = self.d.clone();
        for i in 0..self.rows() {
            let w = self.model.whitening_factor(i);
            if w != 1.0 {
                r.row_mut(i).scale_mut(w);
                s.row_mut(i).scale_mut(w);
                d[i] *= w;
            }
        }
        (r, s, d)
    }

    /// The structure of this conditional, without numbers.
    pub fn structure(&self) -> SymbolicConditional {
        SymbolicConditional::from_checked_keys(self.keys.clone(), self.nr_frontals)
    }

    /// Concatenate the values of `keys[range]`, checking each dimension.
    fn gather(&self, values: &VectorValues, range: Range<usize>) -> Result<DVector<f64>> {
        for i in range.clone() {
            let got = values.at(self.keys[i])?.len();
            if got != self.dims[i] {
                return Err(ElimError::DimensionMismatch {
                    expected: self.dims[i],
                    got,
                    context: format!("value of variable {}", self.keys[i]),
                });
            }
        }
        values.vector(&self.keys[range])
    }

    fn subtract_parents(&self, base: &DVector<f64>, parents: &VectorValues) -> Result<DVector<f64>> {
        if self.nr_parents() == 0 {
            return Ok(base.clone());
        }
        let xs = self.gather(parents, self.nr_frontals..self.keys.len())?;
        Ok(base - &self.s * xs)
    }

    fn split_frontals(&self, x: &DVector<f64>) -> VectorValues {
        let mut out = VectorValues::new();
        let mut offset = 0;
        for (&key, &dim) in self.frontals().iter().zip(&self.dims) {
            out.insert(key, x.rows(offset, dim).into_owned());
            offset += dim;
        }
        out
    }

    fn scale_by_sigmas(&self, x: &mut DVector<f64>) {
        if let NoiseModel::Diagonal(sigmas) = &self.model {
            x.component_mul_assign(sigmas);
        }
    }

    fn singular(&self, (row, pivot): BadPivot) -> ElimError {
        ElimError::SingularSystem {
            key: self.frontal_key_of_row(row),
            pivot,
        }
    }
}

fn hstack(blocks: &[(Key, DMatrix<f64>)], rows: usize) -> DMatrix<f64> {
    let cols = blocks.iter().map(|(_, b)| b.ncols()).sum();
    let mut out = DMatrix::zeros(rows, cols);
    let mut offset = 0;
    for (_, block) in blocks {
        out.view_mut((0, offset), (rows, block.ncols())).copy_from(block);
        offset += block.ncols();
    }
    out
}

impl Conditional for GaussianConditional {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn nr_frontals(&self) -> usize {
        self.nr_frontals
    }

    fn equals(&self, other: &Self, tol: f64) -> bool {
        self.keys == other.keys
            && self.dims == other.dims
            && self.nr_frontals == other.nr_frontals
            && matrices_equal(&self.r, &other.r, tol)
            && matrices_equal(&self.s, &other.s, tol)
            && slices_equal(self.d.as_slice(), other.d.as_slice(), tol)
            && self.model.equals(&other.model, self.rows(), tol)
    }
}

impl fmt::Display for GaussianConditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |keys: &[Key]| {
            keys.iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        write!(f, "p({}", join(self.frontals()))?;
        if self.nr_parents() > 0 {
            write!(f, " | {}", join(self.parents()))?;
        }
        let d: Vec<String> = self.d.iter().map(|x| format!("{:.6}", x)).collect();
        write!(f, ") d = [{}]", d.join(", "))?;
        if !self.model.is_unit() {
            let sigmas: Vec<String> = self
                .model
                .sigmas(self.rows())
                .iter()
                .map(|x| format!("{:.6}", x))
                .collect();
            write!(f, " sigmas = [{}]", sigmas.join(", "))?;
        }
        Ok(())
    }
}
