use nalgebra::DMatrix;
use sprs::{CsMat, TriMat};

/// Incremental sparse matrix builder using triplet (COO) format.
///
/// Duplicate entries at the same (row, col) are summed when converting to CSC.
#[derive(Debug)]
pub struct TripletBuilder {
    triplet: TriMat<f64>,
}

impl TripletBuilder {
    /// Create a new builder for a matrix of the given dimensions.
    pub fn new(nrow: usize, ncol: usize) -> Self {
        Self {
            triplet: TriMat::new((nrow, ncol)),
        }
    }

    /// Add a value at (row, col). Duplicate entries will be summed.
    pub fn add(&mut self, row: usize, col: usize, val: f64) {
        self.triplet.add_triplet(row, col, val);
    }

    /// Add the non-zero entries of a dense block with its top-left corner at (row, col).
    pub fn add_block(&mut self, row: usize, col: usize, block: &DMatrix<f64>) {
        for j in 0..block.ncols() {
            for i in 0..block.nrows() {
                let val = block[(i, j)];
                if val != 0.0 {
                    self.triplet.add_triplet(row + i, col + j, val);
                }
            }
        }
    }

    /// Convert to a CSC (Compressed Sparse Column) matrix.
    pub fn to_csc(&self) -> CsMat<f64> {
        self.triplet.to_csc()
    }

    /// Number of rows.
    pub fn nrow(&self) -> usize {
        self.triplet.rows()
    }

    /// Number of columns.
    pub fn ncol(&self) -> usize {
        self.triplet.cols()
    }
}

/// Multiply a sparse matrix by a dense vector: result = A * x.
pub fn spmv(a: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    assert_eq!(a.cols(), x.len());
    let mut result = vec![0.0; a.rows()];
    for (val, (row, col)) in a.iter() {
        result[row] += val * x[col];
    }
    result
}
