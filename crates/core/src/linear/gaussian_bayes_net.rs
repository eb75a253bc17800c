use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::config::SolveSettings;
use crate::error::{ElimError, Result};
use crate::inference::{BayesNet, Conditional};
use crate::matrix::TripletBuilder;
use crate::symbolic::SymbolicBayesNet;
use crate::types::{Key, SparseMat};

use super::gaussian_conditional::GaussianConditional;
use super::vector_values::VectorValues;

/// A chain of Gaussian conditionals, i.e. an upper-triangular linear system
/// stored block-row by block-row.
pub type GaussianBayesNet = BayesNet<GaussianConditional>;

/// Position of one variable among the columns of [`GaussianBayesNet::matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBlock {
    pub key: Key,
    pub offset: usize,
    pub dim: usize,
}

impl BayesNet<GaussianConditional> {
    /// Solve for the most likely assignment with default settings.
    pub fn optimize(&self) -> Result<VectorValues> {
        self.optimize_with(&SolveSettings::default())
    }

    /// Back-substitution from the last conditional to the first:
    /// each conditional is solved given the parents already computed.
    ///
    /// # Errors
    /// - [`ElimError::SingularSystem`] if a pivot is numerically zero.
    /// - [`ElimError::UnboundVariable`] if a parent has not been solved yet,
    ///   which means the chain is not in elimination order.
    pub fn optimize_with(&self, settings: &SolveSettings) -> Result<VectorValues> {
        log::debug!("optimizing Bayes net of {} conditionals", self.len());
        let mut solution = VectorValues::new();
        for conditional in self.iter().rev() {
            let frontals = conditional.solve(&solution, settings)?;
            for (key, value) in frontals.iter() {
                solution.insert(key, value.clone());
            }
        }
        Ok(solution)
    }

    /// Solve `R x = gx` with the right-hand side taken from `gx`, scaling each
    /// result by the sigmas. With unit noise and `gx` equal to the stored `d`
    /// this is [`optimize`](Self::optimize).
    pub fn back_substitute(&self, gx: &VectorValues) -> Result<VectorValues> {
        self.back_substitute_with(gx, &SolveSettings::default())
    }

    /// # Errors
    /// - [`ElimError::UnboundVariable`] if `gx` lacks a frontal variable.
    /// - [`ElimError::DimensionMismatch`] if a value in `gx` has the wrong size.
    /// - [`ElimError::SingularSystem`] on a zero pivot.
    pub fn back_substitute_with(
        &self,
        gx: &VectorValues,
        settings: &SolveSettings,
    ) -> Result<VectorValues> {
        log::debug!("back-substituting {} conditionals", self.len());
        let mut result = VectorValues::new();
        for conditional in self.iter().rev() {
            let frontals = conditional.solve_other_rhs(&result, gx, settings)?;
            for (key, value) in frontals.iter() {
                result.insert(key, value.clone());
            }
        }
        Ok(result)
    }

    /// Solve `R' x = gx`, processing conditionals in forward order.
    ///
    /// Every variable of `gx` is carried through to the result; variables
    /// not touched by the net keep their input value.
    pub fn back_substitute_transpose(&self, gx: &VectorValues) -> Result<VectorValues> {
        self.back_substitute_transpose_with(gx, &SolveSettings::default())
    }

    pub fn back_substitute_transpose_with(
        &self,
        gx: &VectorValues,
        settings: &SolveSettings,
    ) -> Result<VectorValues> {
        log::debug!("transposed back-substitution over {} conditionals", self.len());
        let mut gy = gx.clone();
        for conditional in self.iter() {
            conditional.solve_transpose_in_place(&mut gy, settings)?;
        }
        Ok(gy)
    }

    /// Sum of the logs of the whitened diagonal of `R`.
    pub fn log_determinant(&self) -> Result<f64> {
        self.log_determinant_with(&SolveSettings::default())
    }

    /// # Errors
    /// Returns [`ElimError::SingularSystem`] if a diagonal entry of `R` is zero or negative.
    pub fn log_determinant_with(&self, settings: &SolveSettings) -> Result<f64> {
        let constrained = self
            .iter()
            .filter(|c| c.model().is_constrained())
            .count();
        if constrained > 0 {
            log::warn!(
                "{} conditionals have constrained rows; their pivots enter the determinant unwhitened",
                constrained
            );
        }
        self.iter()
            .map(|c| c.log_determinant(settings))
            .sum::<Result<f64>>()
    }

    /// Product of the whitened diagonal of `R`, computed as `exp(log_determinant)`.
    pub fn determinant(&self) -> Result<f64> {
        self.determinant_with(&SolveSettings::default())
    }

    pub fn determinant_with(&self, settings: &SolveSettings) -> Result<f64> {
        Ok(self.log_determinant_with(settings)?.exp())
    }

    /// Column layout of [`matrix`](Self::matrix): frontal variables in storage order.
    pub fn ordering(&self) -> Vec<ColumnBlock> {
        let mut blocks = Vec::new();
        let mut offset = 0;
        for conditional in self.iter() {
            for (&key, &dim) in conditional.frontals().iter().zip(conditional.dims()) {
                blocks.push(ColumnBlock { key, offset, dim });
                offset += dim;
            }
        }
        blocks
    }

    /// Total dimension of all frontal variables.
    pub fn dim(&self) -> usize {
        self.iter().map(|c| c.rows()).sum()
    }

    /// The whitened system as one dense upper-triangular matrix and right-hand side.
    ///
    /// Rows are stacked per conditional in storage order; columns follow
    /// [`ordering`](Self::ordering).
    ///
    /// # Errors
    /// - [`ElimError::DuplicateFrontal`] if a variable is frontal in two conditionals.
    /// - [`ElimError::UnboundVariable`] if a parent is not frontal anywhere in the net.
    /// - [`ElimError::DimensionMismatch`] if a parent block disagrees with the
    ///   dimension of the variable where it is frontal.
    pub fn matrix(&self) -> Result<(DMatrix<f64>, DVector<f64>)> {
        let n = self.dim();
        let mut r = DMatrix::zeros(n, n);
        let mut d = DVector::zeros(n);
        self.for_each_block(|row, col, block| {
            r.view_mut((row, col), block.shape()).copy_from(block);
        }, &mut d)?;
        Ok((r, d))
    }

    /// [`matrix`](Self::matrix) as a compressed sparse column matrix.
    pub fn sparse_matrix(&self) -> Result<(SparseMat, DVector<f64>)> {
        let n = self.dim();
        let mut builder = TripletBuilder::new(n, n);
        let mut d = DVector::zeros(n);
        self.for_each_block(|row, col, block| builder.add_block(row, col, block), &mut d)?;
        Ok((builder.to_csc(), d))
    }

    /// Structure of the chain without numbers.
    pub fn structure(&self) -> SymbolicBayesNet {
        self.iter().map(|c| c.structure()).collect()
    }

    /// Visit every whitened block with its (row, column) position and fill `d`.
    fn for_each_block<F>(&self, mut place: F, d: &mut DVector<f64>) -> Result<()>
    where
        F: FnMut(usize, usize, &DMatrix<f64>),
    {
        let mut columns: HashMap<Key, ColumnBlock> = HashMap::with_capacity(self.len());
        for block in self.ordering() {
            if columns.insert(block.key, block).is_some() {
                return Err(ElimError::DuplicateFrontal(block.key));
            }
        }
        let mut row = 0;
        for conditional in self.iter() {
            let (rw, sw, dw) = conditional.whitened();
            let first = columns[&conditional.first_frontal()];
            place(row, first.offset, &rw);

            let mut s_offset = 0;
            let parent_dims = &conditional.dims()[conditional.nr_frontals()..];
            for (&key, &dim) in conditional.parents().iter().zip(parent_dims) {
                let column = columns.get(&key).ok_or(ElimError::UnboundVariable(key))?;
                if column.dim != dim {
                    return Err(ElimError::DimensionMismatch {
                        expected: column.dim,
                        got: dim,
                        context: format!("parent block of variable {}", key),
                    });
                }
                let block = sw.columns(s_offset, dim).into_owned();
                place(row, column.offset, &block);
                s_offset += dim;
            }

            d.rows_mut(row, dw.len()).copy_from(&dw);
            row += conditional.rows();
        }
        Ok(())
    }
}
